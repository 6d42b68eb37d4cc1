//! Trait implementation using the `serial2` crate.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// USB CDC devices ignore the baud rate, but the OS still wants one.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Open a serial port with the given timeout for both reads and writes.
pub fn open(path: impl AsRef<Path>, timeout: Duration) -> std::io::Result<serial2::SerialPort> {
	let mut port = serial2::SerialPort::open(path.as_ref(), DEFAULT_BAUD_RATE)?;
	port.set_read_timeout(timeout)?;
	port.set_write_timeout(timeout)?;
	Ok(port)
}

/// List the serial ports of the system.
pub fn available_ports() -> std::io::Result<Vec<PathBuf>> {
	serial2::SerialPort::available_ports()
}

impl crate::SerialPort for serial2::SerialPort {
	type Instant = std::time::Instant;

	fn discard_input_buffer(&mut self) -> std::io::Result<()> {
		serial2::SerialPort::discard_input_buffer(self)
	}

	fn read(&mut self, buffer: &mut [u8], deadline: &Self::Instant) -> std::io::Result<usize> {
		let timeout = deadline.checked_duration_since(Instant::now())
			.ok_or(std::io::ErrorKind::TimedOut)?;
		self.set_read_timeout(timeout)?;
		serial2::SerialPort::read(self, buffer)
	}

	fn write_all(&mut self, buffer: &[u8]) -> std::io::Result<()> {
		serial2::SerialPort::write_all(self, buffer)
	}

	fn make_deadline(&self, timeout: Duration) -> Self::Instant {
		Instant::now() + timeout
	}
}
