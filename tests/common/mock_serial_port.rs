use snes_link::SerialPort;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// An in-memory serial port.
///
/// Clones share their buffers, so a test can keep a clone to play the device side.
#[derive(Default, Clone)]
pub struct MockSerialPort {
	/// Bytes the device sends to the host.
	pub read_buffer: Arc<Mutex<VecDeque<u8>>>,

	/// Bytes the host sent to the device.
	pub write_buffer: Arc<Mutex<Vec<u8>>>,

	/// Replies the device sends, one after each write of the host.
	pub replies: Arc<Mutex<VecDeque<Vec<u8>>>>,

	/// Make every write fail with this error kind.
	pub write_error: Arc<Mutex<Option<std::io::ErrorKind>>>,
}

#[allow(dead_code)]
impl MockSerialPort {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queue a reply that the device sends after the next write of the host.
	pub fn push_reply(&self, data: &[u8]) {
		self.replies.lock().unwrap().push_back(data.to_vec());
	}

	/// Take everything the host wrote so far.
	pub fn take_written(&self) -> Vec<u8> {
		std::mem::take(&mut *self.write_buffer.lock().unwrap())
	}

	pub fn fail_writes(&self, kind: std::io::ErrorKind) {
		*self.write_error.lock().unwrap() = Some(kind);
	}
}

impl SerialPort for MockSerialPort {
	type Instant = std::time::Instant;

	fn discard_input_buffer(&mut self) -> std::io::Result<()> {
		self.read_buffer.lock().unwrap().clear();
		Ok(())
	}

	fn read(&mut self, buffer: &mut [u8], deadline: &Self::Instant) -> std::io::Result<usize> {
		loop {
			{
				let mut data = self.read_buffer.lock().unwrap();
				if !data.is_empty() {
					let len = buffer.len().min(data.len());
					for (dest, byte) in buffer.iter_mut().zip(data.drain(..len)) {
						*dest = byte;
					}
					return Ok(len);
				}
			}
			if Instant::now() > *deadline {
				return Err(std::io::ErrorKind::TimedOut.into());
			}
			std::thread::sleep(Duration::from_millis(1));
		}
	}

	fn write_all(&mut self, buffer: &[u8]) -> std::io::Result<()> {
		if let Some(kind) = *self.write_error.lock().unwrap() {
			return Err(kind.into());
		}
		self.write_buffer.lock().unwrap().extend_from_slice(buffer);
		if let Some(reply) = self.replies.lock().unwrap().pop_front() {
			self.read_buffer.lock().unwrap().extend(reply);
		}
		Ok(())
	}

	fn make_deadline(&self, timeout: Duration) -> Self::Instant {
		Instant::now() + timeout
	}
}
