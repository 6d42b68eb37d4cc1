//! Command queues: batching of raw requests into transport commands.

use std::sync::Arc;

use crate::{CommandError, ReadRequest, WriteRequest};

mod dispatcher;
mod keep_alive;
mod link;

pub use dispatcher::{Dispatcher, Pending};
pub use keep_alive::KeepAlive;
pub use link::{ClosedSignal, Link};

/// The maximum number of requests in a single command.
pub const MAX_BATCH_SIZE: usize = 8;

/// An opened connection to one device.
///
/// A queue owns the physical link exclusively.
/// It translates requests into a [`CommandSequence`],
/// but does not execute anything by itself.
/// Commands of one queue never interleave on the link:
/// each command holds the link for its whole execution, even when several threads execute sequences.
/// A [`Dispatcher`] additionally keeps whole sequences in submission order.
pub trait Queue: Send + Sync {
	/// The name of the driver that opened this queue.
	fn driver(&self) -> &'static str;

	/// Partition read requests into commands of at most [`MAX_BATCH_SIZE`] requests each.
	///
	/// The order of the requests is preserved.
	/// The batch completion is attached to every command and invoked once per command.
	fn make_read_commands(&self, requests: Vec<ReadRequest>, batch_completion: Option<BatchCompletion>) -> CommandSequence;

	/// Partition write requests into commands of at most [`MAX_BATCH_SIZE`] requests each.
	///
	/// The order of the requests is preserved.
	/// The batch completion is attached to every command and invoked once per command.
	fn make_write_commands(&self, requests: Vec<WriteRequest>, batch_completion: Option<BatchCompletion>) -> CommandSequence;

	/// Close the queue.
	///
	/// Closing an already closed queue does nothing and succeeds.
	/// An in-flight command is not interrupted, but every later command fails with [`crate::ConnectionClosed`].
	fn close(&self) -> Result<(), CommandError>;

	/// Get the signal that fires once the queue is closed.
	fn closed(&self) -> ClosedSignal;

	/// Check if an error means the connection must be re-established rather than retried.
	fn is_terminal_error(&self, error: &CommandError) -> bool;
}

/// One unit of transport work: a batch of reads or a batch of writes.
///
/// The connection is not part of the command.
/// It is passed in as the execution context `link`, so commands need no knowledge of the queue that created them.
pub trait Command<C>: Send {
	/// The number of requests in the batch.
	fn len(&self) -> usize;

	/// True if the batch holds write requests.
	fn is_write(&self) -> bool;

	/// Execute the batch on the connection.
	///
	/// Implementations must return [`crate::ConnectionClosed`] without touching the transport if the link is closed,
	/// and must close the link on any transport error.
	fn execute(self: Box<Self>, link: &Link<C>, keep_alive: &KeepAlive) -> Result<(), CommandError>;
}

/// Callback invoked once per command with the result of that command.
pub type BatchCompletion = Arc<dyn Fn(Result<(), &CommandError>) + Send + Sync>;

/// A command bound to the link it must be executed on.
pub struct BoundCommand {
	len: usize,
	is_write: bool,
	run: Box<dyn FnOnce(&KeepAlive) -> Result<(), CommandError> + Send>,
}

/// A command with the batch completion to invoke after it executed.
pub struct CommandWithCompletion {
	pub command: BoundCommand,
	pub completion: Option<BatchCompletion>,
}

/// An ordered list of commands.
#[derive(Default)]
pub struct CommandSequence {
	commands: Vec<CommandWithCompletion>,
}

impl BoundCommand {
	/// Bind a command to a link.
	pub fn bind<C, K>(link: Arc<Link<C>>, command: K) -> Self
	where
		C: Send + Sync + 'static,
		K: Command<C> + 'static,
	{
		let len = command.len();
		let is_write = command.is_write();
		let command = Box::new(command);
		Self {
			len,
			is_write,
			run: Box::new(move |keep_alive| {
				let _running = link.lock_execution();
				command.execute(&link, keep_alive)
			}),
		}
	}

	/// The number of requests in the batch.
	pub fn len(&self) -> usize {
		self.len
	}

	/// True if the batch is empty (never the case for commands made by a queue).
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// True if the batch holds write requests.
	pub fn is_write(&self) -> bool {
		self.is_write
	}

	/// Execute the command.
	pub fn execute(self, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		(self.run)(keep_alive)
	}
}

impl CommandWithCompletion {
	/// Execute the command and invoke the batch completion with the result.
	pub fn execute(self, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		let result = self.command.execute(keep_alive);
		if let Some(completion) = &self.completion {
			completion(result.as_ref().map(|_| ()));
		}
		result
	}
}

impl CommandSequence {
	/// Create an empty sequence.
	pub fn new() -> Self {
		Self::default()
	}

	/// The number of commands in the sequence.
	pub fn len(&self) -> usize {
		self.commands.len()
	}

	/// True if the sequence holds no commands.
	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}

	/// Get the commands in execution order.
	pub fn commands(&self) -> &[CommandWithCompletion] {
		&self.commands
	}

	/// Add a command to the end of the sequence.
	pub fn push(&mut self, command: CommandWithCompletion) {
		self.commands.push(command);
	}

	/// Append all commands of another sequence.
	pub fn append(&mut self, mut other: CommandSequence) {
		self.commands.append(&mut other.commands);
	}

	/// Execute all commands in order on the calling thread.
	///
	/// Every command is executed, even after a failure:
	/// a failed command closes its link, so the commands after it fail fast with [`crate::ConnectionClosed`]
	/// and their batch completions see that error.
	///
	/// Returns the first error.
	pub fn execute(self, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		let mut first_error = None;
		for command in self.commands {
			if let Err(e) = command.execute(keep_alive) {
				first_error.get_or_insert(e);
			}
		}
		match first_error {
			None => Ok(()),
			Some(e) => Err(e),
		}
	}
}

impl IntoIterator for CommandSequence {
	type Item = CommandWithCompletion;
	type IntoIter = std::vec::IntoIter<CommandWithCompletion>;

	fn into_iter(self) -> Self::IntoIter {
		self.commands.into_iter()
	}
}

/// Partition requests into batches of at most [`MAX_BATCH_SIZE`] and bind a command for each batch to the link.
///
/// Used by the queue implementations for both reads and writes.
pub fn make_commands<R, C, K, F>(
	link: &Arc<Link<C>>,
	requests: Vec<R>,
	batch_completion: Option<BatchCompletion>,
	mut make_command: F,
) -> CommandSequence
where
	C: Send + Sync + 'static,
	K: Command<C> + 'static,
	F: FnMut(Vec<R>) -> K,
{
	let mut commands = Vec::with_capacity(requests.len().div_ceil(MAX_BATCH_SIZE));
	let mut requests = requests.into_iter().peekable();
	while requests.peek().is_some() {
		let batch: Vec<R> = requests.by_ref().take(MAX_BATCH_SIZE).collect();
		commands.push(CommandWithCompletion {
			command: BoundCommand::bind(link.clone(), make_command(batch)),
			completion: batch_completion.clone(),
		});
	}
	CommandSequence { commands }
}

impl std::fmt::Debug for dyn Queue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Queue")
			.field("driver", &self.driver())
			.field("closed", &self.closed().is_closed())
			.finish()
	}
}

impl std::fmt::Debug for BoundCommand {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BoundCommand")
			.field("len", &self.len)
			.field("is_write", &self.is_write)
			.finish_non_exhaustive()
	}
}

impl std::fmt::Debug for CommandWithCompletion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CommandWithCompletion")
			.field("command", &self.command)
			.field("completion", &self.completion.is_some())
			.finish()
	}
}

impl std::fmt::Debug for CommandSequence {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(&self.commands).finish()
	}
}
