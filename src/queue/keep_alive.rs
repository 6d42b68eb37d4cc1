use std::sync::mpsc;

/// Liveness pulses sent by commands while they execute.
///
/// An external watchdog consumes the pulses so it does not declare the link dead during a long multi-packet transfer.
/// Pulsing never blocks: if the watchdog falls behind, pulses are dropped.
#[derive(Clone, Debug, Default)]
pub struct KeepAlive {
	sender: Option<mpsc::SyncSender<()>>,
}

impl KeepAlive {
	/// Create a keep-alive that buffers up to `capacity` pulses for the returned receiver.
	pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<()>) {
		let (sender, receiver) = mpsc::sync_channel(capacity);
		(Self { sender: Some(sender) }, receiver)
	}

	/// Create a keep-alive that nobody listens to.
	pub fn disabled() -> Self {
		Self { sender: None }
	}

	/// Send one pulse without blocking.
	pub fn pulse(&self) {
		if let Some(sender) = &self.sender {
			// Full means the watchdog is behind, disconnected means it is gone: both are fine to ignore.
			let _ = sender.try_send(());
		}
	}
}
