use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::client::LineTransport;
use super::DRIVER_NAME;
use crate::lorom::pak_address_to_bus;
use crate::{
	make_commands,
	BatchCompletion,
	ClosedSignal,
	Command,
	CommandError,
	CommandSequence,
	InvalidResponse,
	KeepAlive,
	Link,
	Operation,
	Queue,
	ReadRequest,
	Timeout,
	TransferError,
	WriteRequest,
};

/// Large enough for the reply to a 255 byte read.
const MAX_REPLY_LEN: usize = 1024;

/// A queue for a RetroArch instance, speaking its network command interface.
///
/// Every request is sent as its own line.
/// The transport is shared with the driver, so closing the queue does not close it.
pub struct RetroArchQueue<T> {
	link: Arc<Link<T>>,
	timeout: Duration,
}

struct ReadCommand {
	batch: Vec<ReadRequest>,
	timeout: Duration,
}

struct WriteCommand {
	batch: Vec<WriteRequest>,
	timeout: Duration,
}

impl<T: LineTransport + 'static> RetroArchQueue<T> {
	/// Create a queue that uses a shared transport.
	///
	/// `timeout` is the deadline for every line sent and every reply received.
	pub fn new(transport: Arc<T>, timeout: Duration) -> Self {
		Self {
			link: Arc::new(Link::from_shared(DRIVER_NAME, transport)),
			timeout,
		}
	}

	pub(super) fn link(&self) -> &Arc<Link<T>> {
		&self.link
	}
}

/// Format the command line that writes the data of a request.
///
/// The address is translated to a SNES bus address.
pub fn encode_write_line(address: u32, data: &[u8]) -> String {
	let mut line = String::with_capacity(22 + data.len() * 3);
	// Writing to a String can not fail.
	let _ = write!(line, "WRITE_CORE_RAM {:06x}", pak_address_to_bus(address));
	for byte in data {
		let _ = write!(line, " {:02x}", byte);
	}
	line.push('\n');
	line
}

/// Format the command line that reads the memory of a request.
pub fn encode_read_line(address: u32, size: u8) -> String {
	format!("READ_CORE_RAM {:06x} {}\n", pak_address_to_bus(address), size)
}

/// Parse the reply to a read command.
///
/// Returns `Ok(None)` if the message is not a reply to a read of `bus_address`.
pub fn parse_read_reply(message: &str, bus_address: u32, size: u8) -> Result<Option<Vec<u8>>, InvalidResponse> {
	let mut fields = message.split_ascii_whitespace();
	if fields.next() != Some("READ_CORE_RAM") {
		return Ok(None);
	}
	let address = fields.next()
		.and_then(|x| u32::from_str_radix(x, 16).ok())
		.ok_or_else(|| InvalidResponse::new(format!("malformed read reply: {:?}", message)))?;
	if address != bus_address {
		return Ok(None);
	}

	let mut data = Vec::with_capacity(size.into());
	for field in fields {
		if field == "-1" {
			return Err(InvalidResponse::new(format!("read of {:06x} refused", bus_address)));
		}
		let byte = u8::from_str_radix(field, 16)
			.map_err(|_| InvalidResponse::new(format!("malformed byte in read reply: {:?}", field)))?;
		data.push(byte);
	}
	if data.len() != usize::from(size) {
		return Err(InvalidResponse::new(format!("expected {} bytes in read reply, got {}", size, data.len())));
	}
	Ok(Some(data))
}

impl<T: LineTransport + 'static> Queue for RetroArchQueue<T> {
	fn driver(&self) -> &'static str {
		DRIVER_NAME
	}

	fn make_read_commands(&self, requests: Vec<ReadRequest>, batch_completion: Option<BatchCompletion>) -> CommandSequence {
		let timeout = self.timeout;
		make_commands(&self.link, requests, batch_completion, |batch| ReadCommand { batch, timeout })
	}

	fn make_write_commands(&self, requests: Vec<WriteRequest>, batch_completion: Option<BatchCompletion>) -> CommandSequence {
		let timeout = self.timeout;
		make_commands(&self.link, requests, batch_completion, |batch| WriteCommand { batch, timeout })
	}

	fn close(&self) -> Result<(), CommandError> {
		// The transport stays open, the driver reuses it for detection.
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

impl<T: LineTransport> Command<T> for WriteCommand {
	fn len(&self) -> usize {
		self.batch.len()
	}

	fn is_write(&self) -> bool {
		true
	}

	fn execute(self: Box<Self>, link: &Link<T>, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		let transport = link.handle()?;
		keep_alive.pulse();

		for request in self.batch {
			let line = encode_write_line(request.address, &request.data);
			trace!("retroarch: > {}", line.trim_end());
			if let Err(e) = transport.send_timeout(line.as_bytes(), self.timeout) {
				link.close();
				return Err(TransferError::from_io(e, Operation::Write, self.timeout).into());
			}
			keep_alive.pulse();
			request.complete();
		}
		Ok(())
	}
}

impl<T: LineTransport> Command<T> for ReadCommand {
	fn len(&self) -> usize {
		self.batch.len()
	}

	fn is_write(&self) -> bool {
		false
	}

	fn execute(self: Box<Self>, link: &Link<T>, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		let transport = link.handle()?;
		keep_alive.pulse();

		for request in self.batch {
			match read_one(&*transport, &request, self.timeout) {
				Ok(data) => {
					keep_alive.pulse();
					request.complete(data);
				},
				Err(e) => {
					link.close();
					return Err(e.into());
				},
			}
		}
		Ok(())
	}
}

/// Send one read command and wait for its reply.
///
/// Messages that do not answer the request are skipped until the deadline expires.
fn read_one<T: LineTransport + ?Sized>(transport: &T, request: &ReadRequest, timeout: Duration) -> Result<Vec<u8>, TransferError> {
	let line = encode_read_line(request.address, request.size);
	trace!("retroarch: > {}", line.trim_end());
	transport.send_timeout(line.as_bytes(), timeout)
		.map_err(|e| TransferError::from_io(e, Operation::Write, timeout))?;

	let bus_address = pak_address_to_bus(request.address);
	let deadline = Instant::now() + timeout;
	let mut buffer = [0; MAX_REPLY_LEN];
	loop {
		let remaining = deadline.saturating_duration_since(Instant::now());
		if remaining.is_zero() {
			return Err(Timeout { operation: Operation::Read, timeout }.into());
		}
		let len = transport.recv_timeout(&mut buffer, remaining)
			.map_err(|e| TransferError::from_io(e, Operation::Read, timeout))?;
		let message = String::from_utf8_lossy(&buffer[..len]);
		trace!("retroarch: < {}", message.trim_end());
		match parse_read_reply(&message, bus_address, request.size)? {
			Some(data) => return Ok(data),
			None => debug!("retroarch: ignoring unexpected message: {:?}", message.trim_end()),
		}
	}
}

impl<T> std::fmt::Debug for RetroArchQueue<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RetroArchQueue")
			.field("link", &self.link)
			.field("timeout", &self.timeout)
			.finish()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::{assert, let_assert};

	#[test]
	fn write_line() {
		assert!(encode_write_line(0xF5_0010, &[0x01, 0xAB]) == "WRITE_CORE_RAM 7e0010 01 ab\n");
		assert!(encode_write_line(0x00_0000, &[0xFF]) == "WRITE_CORE_RAM 008000 ff\n");
		assert!(encode_write_line(0xE0_0000, &[0, 1, 2]) == "WRITE_CORE_RAM 700000 00 01 02\n");
	}

	#[test]
	fn read_line() {
		assert!(encode_read_line(0xF5_0010, 2) == "READ_CORE_RAM 7e0010 2\n");
		assert!(encode_read_line(0xF5_0000, 255) == "READ_CORE_RAM 7e0000 255\n");
	}

	#[test]
	fn read_reply() {
		let_assert!(Ok(Some(data)) = parse_read_reply("READ_CORE_RAM 7e0010 01 AB\n", 0x7E_0010, 2));
		assert!(data == [0x01, 0xAB]);
		let_assert!(Ok(Some(data)) = parse_read_reply("READ_CORE_RAM 7e0010 01 ab", 0x7E_0010, 2));
		assert!(data == [0x01, 0xAB]);
	}

	#[test]
	fn unrelated_messages_are_skipped() {
		assert!(let Ok(None) = parse_read_reply("1.19.1\n", 0x7E_0010, 2));
		assert!(let Ok(None) = parse_read_reply("READ_CORE_RAM 7e0020 01 02\n", 0x7E_0010, 2));
	}

	#[test]
	fn bad_read_replies() {
		assert!(let Err(_) = parse_read_reply("READ_CORE_RAM 7e0010 -1\n", 0x7E_0010, 2));
		assert!(let Err(_) = parse_read_reply("READ_CORE_RAM 7e0010 01\n", 0x7E_0010, 2));
		assert!(let Err(_) = parse_read_reply("READ_CORE_RAM 7e0010 01 zz\n", 0x7E_0010, 2));
		assert!(let Err(_) = parse_read_reply("READ_CORE_RAM\n", 0x7E_0010, 2));
	}
}
