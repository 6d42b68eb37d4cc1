//! [`SerialPort`] trait to talk to USB-serial devices through different serial port implementations.

use core::time::Duration;

#[cfg(feature = "serial2")]
pub mod serial2;

/// [`SerialPort`]s carry the raw bytes of a USB-serial protocol.
///
/// The implementor must already be configured for the device (USB CDC devices ignore the baud rate).
pub trait SerialPort: Send {
	/// A point in time that can be used as a deadline for I/O operations.
	type Instant: Copy;

	/// Discard the input buffer of the serial port. Maybe a no-op on some platforms.
	fn discard_input_buffer(&mut self) -> std::io::Result<()>;

	/// Returns available bytes to read, blocking until at least one byte is available or the deadline expires.
	fn read(&mut self, buffer: &mut [u8], deadline: &Self::Instant) -> std::io::Result<usize>;

	/// Write all bytes in the buffer to the serial port.
	fn write_all(&mut self, buffer: &[u8]) -> std::io::Result<()>;

	/// Make a deadline to expire after the given timeout.
	fn make_deadline(&self, timeout: Duration) -> Self::Instant;

	/// Check if an error indicates a timeout.
	fn is_timeout_error(error: &std::io::Error) -> bool
	where
		Self: Sized,
	{
		error.kind() == std::io::ErrorKind::TimedOut
	}
}
