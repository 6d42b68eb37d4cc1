use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::protocol::{self, opcode, Descriptor};
use super::DRIVER_NAME;
use crate::{
	make_commands,
	BatchCompletion,
	ClosedSignal,
	Command,
	CommandError,
	CommandSequence,
	KeepAlive,
	Link,
	Queue,
	ReadRequest,
	SerialPort,
	TransferError,
	WriteRequest,
};

/// A queue for an FX Pak Pro connected over USB.
///
/// Every command becomes one vectored transfer (VGET or VPUT) of at most eight requests.
pub struct FxPakQueue<P> {
	link: Arc<Link<Connection<P>>>,
}

/// The serial port of an opened cart.
pub struct Connection<P> {
	port: Mutex<P>,
	timeout: Duration,
}

struct ReadCommand {
	batch: Vec<ReadRequest>,
}

struct WriteCommand {
	batch: Vec<WriteRequest>,
}

impl<P: SerialPort + 'static> FxPakQueue<P> {
	/// Create a queue for an opened serial port.
	///
	/// `timeout` limits every single transfer on the port.
	pub fn new(port: P, timeout: Duration) -> Self {
		let connection = Connection {
			port: Mutex::new(port),
			timeout,
		};
		Self {
			link: Arc::new(Link::new(DRIVER_NAME, connection)),
		}
	}
}

impl<P: SerialPort> Connection<P> {
	/// Write the payloads of a batch to memory.
	///
	/// The cart does not acknowledge the transfer.
	fn vput(&self, batch: &[WriteRequest]) -> Result<(), TransferError> {
		let descriptors: Vec<Descriptor> = batch.iter().map(|x| Descriptor { address: x.address, size: x.size }).collect();
		let payload_len = protocol::payload_len(&descriptors);

		// One blob for all payloads, zero padded to whole frames.
		let mut blob = Vec::with_capacity(protocol::padded_len(payload_len));
		for request in batch {
			blob.extend_from_slice(&request.data);
		}
		blob.resize(protocol::padded_len(payload_len), 0);

		let mut port = self.lock();
		protocol::send(&mut *port, &protocol::encode_vector_frame(opcode::VPUT, &descriptors), self.timeout)?;
		protocol::send(&mut *port, &blob, self.timeout)?;
		Ok(())
	}

	/// Read the memory of a batch, returning the data of all requests back to back.
	fn vget(&self, batch: &[ReadRequest]) -> Result<Vec<u8>, TransferError> {
		let descriptors: Vec<Descriptor> = batch.iter().map(|x| Descriptor { address: x.address, size: x.size }).collect();
		let payload_len = protocol::payload_len(&descriptors);

		let mut port = self.lock();
		// Stale bytes from an earlier failed transfer would shift the reply.
		port.discard_input_buffer().map_err(TransferError::Io)?;
		protocol::send(&mut *port, &protocol::encode_vector_frame(opcode::VGET, &descriptors), self.timeout)?;

		let mut blob = vec![0; protocol::padded_len(payload_len)];
		protocol::recv(&mut *port, &mut blob, self.timeout)?;
		blob.truncate(payload_len);
		Ok(blob)
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, P> {
		self.port.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl<P: SerialPort + 'static> Queue for FxPakQueue<P> {
	fn driver(&self) -> &'static str {
		DRIVER_NAME
	}

	fn make_read_commands(&self, requests: Vec<ReadRequest>, batch_completion: Option<BatchCompletion>) -> CommandSequence {
		make_commands(&self.link, requests, batch_completion, |batch| ReadCommand { batch })
	}

	fn make_write_commands(&self, requests: Vec<WriteRequest>, batch_completion: Option<BatchCompletion>) -> CommandSequence {
		make_commands(&self.link, requests, batch_completion, |batch| WriteCommand { batch })
	}

	fn close(&self) -> Result<(), CommandError> {
		self.link.close();
		Ok(())
	}

	fn closed(&self) -> ClosedSignal {
		self.link.closed()
	}

	fn is_terminal_error(&self, error: &CommandError) -> bool {
		matches!(error, CommandError::Transfer(_))
	}
}

impl<P: SerialPort> Command<Connection<P>> for ReadCommand {
	fn len(&self) -> usize {
		self.batch.len()
	}

	fn is_write(&self) -> bool {
		false
	}

	fn execute(self: Box<Self>, link: &Link<Connection<P>>, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		let connection = link.handle()?;
		keep_alive.pulse();
		let data = match connection.vget(&self.batch) {
			Ok(data) => data,
			Err(e) => {
				link.close();
				return Err(e.into());
			},
		};
		keep_alive.pulse();

		let mut data = data.as_slice();
		for request in self.batch {
			let (head, tail) = data.split_at(usize::from(request.size));
			data = tail;
			request.complete(head.to_vec());
		}
		Ok(())
	}
}

impl<P: SerialPort> Command<Connection<P>> for WriteCommand {
	fn len(&self) -> usize {
		self.batch.len()
	}

	fn is_write(&self) -> bool {
		true
	}

	fn execute(self: Box<Self>, link: &Link<Connection<P>>, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		let connection = link.handle()?;
		keep_alive.pulse();
		if let Err(e) = connection.vput(&self.batch) {
			link.close();
			return Err(e.into());
		}
		keep_alive.pulse();

		for request in self.batch {
			request.complete();
		}
		Ok(())
	}
}

impl<P> std::fmt::Debug for FxPakQueue<P> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FxPakQueue")
			.field("link", &self.link)
			.finish()
	}
}

impl<P> std::fmt::Debug for Connection<P> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Connection")
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}
