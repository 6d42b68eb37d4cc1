use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::ConnectionClosed;

/// The connection handle of a queue, shared with the commands it creates.
///
/// The handle mutex only guards swapping the handle, not the I/O performed with it.
/// Commands take a clone of the handle and release the lock before talking to the device,
/// which is why the connection type must support I/O through a shared reference.
///
/// A second mutex serializes whole commands, so commands never interleave on the link
/// no matter how many threads execute sequences of the same queue.
/// Closing only takes the handle mutex and does not wait for a running command.
pub struct Link<C> {
	driver: &'static str,
	handle: Mutex<Option<Arc<C>>>,
	execution: Mutex<()>,
	closed: ClosedSignal,
}

/// One-shot signal that fires when a queue is closed.
///
/// Cloned signals observe the same event.
#[derive(Clone, Default)]
pub struct ClosedSignal {
	inner: Arc<(Mutex<bool>, Condvar)>,
}

impl<C> Link<C> {
	/// Create a new open link for a connection.
	pub fn new(driver: &'static str, connection: C) -> Self {
		Self::from_shared(driver, Arc::new(connection))
	}

	/// Create a new open link for a connection that is also used elsewhere.
	pub fn from_shared(driver: &'static str, connection: Arc<C>) -> Self {
		Self {
			driver,
			handle: Mutex::new(Some(connection)),
			execution: Mutex::new(()),
			closed: ClosedSignal::new(),
		}
	}

	/// The name of the driver that owns the link.
	pub fn driver(&self) -> &'static str {
		self.driver
	}

	/// Get the connection, or [`ConnectionClosed`] if the link has been closed.
	pub fn handle(&self) -> Result<Arc<C>, ConnectionClosed> {
		self.lock().clone().ok_or(ConnectionClosed { driver: self.driver })
	}

	/// Close the link.
	///
	/// Returns true if this call closed the link, false if it was already closed.
	/// The closed signal fires while the handle lock is held, so it fires exactly once even with concurrent callers.
	pub fn close(&self) -> bool {
		let mut handle = self.lock();
		if handle.take().is_none() {
			return false;
		}
		debug!("{}: connection closed", self.driver);
		self.closed.fire();
		true
	}

	/// Check if the link has been closed.
	pub fn is_closed(&self) -> bool {
		self.lock().is_none()
	}

	/// Get the signal that fires when the link is closed.
	pub fn closed(&self) -> ClosedSignal {
		self.closed.clone()
	}

	/// Claim the link for one command, blocking while another command runs.
	pub(crate) fn lock_execution(&self) -> MutexGuard<'_, ()> {
		self.execution.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn lock(&self) -> MutexGuard<'_, Option<Arc<C>>> {
		self.handle.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl ClosedSignal {
	/// Create a signal that has not fired yet.
	pub fn new() -> Self {
		Self::default()
	}

	/// Check if the signal has fired.
	pub fn is_closed(&self) -> bool {
		*self.lock()
	}

	/// Block until the signal fires.
	pub fn wait(&self) {
		let (_, condvar) = &*self.inner;
		let mut closed = self.lock();
		while !*closed {
			closed = condvar.wait(closed).unwrap_or_else(PoisonError::into_inner);
		}
	}

	/// Block until the signal fires or the timeout expires.
	///
	/// Returns true if the signal fired.
	pub fn wait_timeout(&self, timeout: Duration) -> bool {
		let (_, condvar) = &*self.inner;
		let closed = self.lock();
		let (closed, _) = condvar
			.wait_timeout_while(closed, timeout, |closed| !*closed)
			.unwrap_or_else(PoisonError::into_inner);
		*closed
	}

	/// Fire the signal, waking all waiters.
	///
	/// Returns false if the signal already fired.
	pub(crate) fn fire(&self) -> bool {
		let (_, condvar) = &*self.inner;
		let mut closed = self.lock();
		if *closed {
			return false;
		}
		*closed = true;
		condvar.notify_all();
		true
	}

	fn lock(&self) -> MutexGuard<'_, bool> {
		self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl<C> std::fmt::Debug for Link<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Link")
			.field("driver", &self.driver)
			.field("closed", &self.is_closed())
			.finish_non_exhaustive()
	}
}

impl std::fmt::Debug for ClosedSignal {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("ClosedSignal").field(&self.is_closed()).finish()
	}
}
