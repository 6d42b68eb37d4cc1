use std::sync::mpsc;
use std::thread::JoinHandle;

use super::{BatchCompletion, ClosedSignal, CommandSequence, KeepAlive, Queue};
use crate::{CommandError, ConnectionClosed, ReadRequest, WriteRequest};

/// The single serial dispatch point of a queue.
///
/// A worker thread executes submitted command sequences one at a time, in submission order,
/// so commands for the same link never interleave.
/// Dropping the dispatcher waits for the already submitted work to finish.
pub struct Dispatcher {
	queue: Box<dyn Queue>,
	sender: Option<mpsc::Sender<Job>>,
	worker: Option<JoinHandle<()>>,
}

/// The outcome of a submitted command sequence, available once the worker executed it.
#[derive(Debug)]
pub struct Pending {
	driver: &'static str,
	receiver: mpsc::Receiver<Result<(), CommandError>>,
}

struct Job {
	sequence: CommandSequence,
	done: mpsc::Sender<Result<(), CommandError>>,
}

impl Dispatcher {
	/// Start a worker thread for the queue.
	///
	/// Every command executed by the worker pulses `keep_alive`.
	pub fn new(queue: Box<dyn Queue>, keep_alive: KeepAlive) -> std::io::Result<Self> {
		let driver = queue.driver();
		let (sender, jobs) = mpsc::channel::<Job>();
		let worker = std::thread::Builder::new()
			.name(format!("{}-dispatch", driver))
			.spawn(move || {
				for job in jobs {
					trace!("{}: executing {} command(s)", driver, job.sequence.len());
					let result = job.sequence.execute(&keep_alive);
					if let Err(e) = &result {
						warn!("{}: {}", driver, e);
					}
					// The submitter may have dropped its `Pending`.
					let _ = job.done.send(result);
				}
				debug!("{}: dispatcher stopped", driver);
			})?;
		Ok(Self {
			queue,
			sender: Some(sender),
			worker: Some(worker),
		})
	}

	/// Get the queue the dispatcher executes commands for.
	pub fn queue(&self) -> &dyn Queue {
		&*self.queue
	}

	/// Submit a command sequence for execution.
	///
	/// The sequence must have been made by the queue of this dispatcher.
	pub fn submit(&self, sequence: CommandSequence) -> Pending {
		let (done, receiver) = mpsc::channel();
		if let Some(sender) = &self.sender {
			if sender.send(Job { sequence, done }).is_err() {
				error!("{}: dispatcher worker is gone", self.queue.driver());
			}
		}
		Pending {
			driver: self.queue.driver(),
			receiver,
		}
	}

	/// Make read commands with the queue and submit them.
	pub fn read(&self, requests: Vec<ReadRequest>, batch_completion: Option<BatchCompletion>) -> Pending {
		self.submit(self.queue.make_read_commands(requests, batch_completion))
	}

	/// Make write commands with the queue and submit them.
	pub fn write(&self, requests: Vec<WriteRequest>, batch_completion: Option<BatchCompletion>) -> Pending {
		self.submit(self.queue.make_write_commands(requests, batch_completion))
	}

	/// Close the queue.
	///
	/// Commands that are still waiting in the dispatcher fail with [`ConnectionClosed`].
	pub fn close(&self) -> Result<(), CommandError> {
		self.queue.close()
	}

	/// Get the closed signal of the queue.
	pub fn closed(&self) -> ClosedSignal {
		self.queue.closed()
	}

	/// Check if an error returned by this dispatcher requires a reconnect.
	pub fn is_terminal_error(&self, error: &CommandError) -> bool {
		self.queue.is_terminal_error(error)
	}
}

impl Pending {
	/// Block until the sequence has been executed.
	///
	/// Returns the first error of the sequence.
	/// If the worker stopped before executing the sequence, this returns [`ConnectionClosed`].
	pub fn wait(self) -> Result<(), CommandError> {
		match self.receiver.recv() {
			Ok(result) => result,
			Err(mpsc::RecvError) => Err(ConnectionClosed { driver: self.driver }.into()),
		}
	}
}

impl Drop for Dispatcher {
	fn drop(&mut self) {
		// Closing the job channel stops the worker once it drained the submitted sequences.
		self.sender = None;
		if let Some(worker) = self.worker.take() {
			if worker.join().is_err() {
				error!("{}: dispatcher worker panicked", self.queue.driver());
			}
		}
	}
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("driver", &self.queue.driver())
			.field("closed", &self.queue.closed().is_closed())
			.finish_non_exhaustive()
	}
}
