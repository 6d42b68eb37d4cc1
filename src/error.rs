use std::time::Duration;

/// An error that can occur while opening a connection to a device.
#[derive(Debug)]
pub enum OpenError {
	UnknownDriver(UnknownDriver),
	InvalidDevice(InvalidDevice),
	Io(std::io::Error),
}

/// An error that can occur while executing a command.
#[derive(Debug)]
pub enum CommandError {
	/// The connection was closed before the command could use it.
	ConnectionClosed(ConnectionClosed),

	/// The transfer failed. The connection is closed when this happens.
	Transfer(TransferError),
}

/// An error that can occur while talking to a device.
#[derive(Debug)]
pub enum TransferError {
	Io(std::io::Error),
	Timeout(Timeout),
	InvalidResponse(InvalidResponse),
}

/// No driver is registered with the requested name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownDriver {
	pub name: String,
}

/// The device descriptor can not be used by the driver.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidDevice {
	pub driver: &'static str,
	pub device: String,
	pub reason: String,
}

/// The connection of a queue has already been closed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ConnectionClosed {
	pub driver: &'static str,
}

/// The kind of transfer that was being performed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Operation {
	Read,
	Write,
}

/// A transfer did not finish before its deadline.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Timeout {
	pub operation: Operation,
	pub timeout: Duration,
}

/// The device sent a reply that does not answer the request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidResponse {
	pub reason: String,
}

impl CommandError {
	/// Check if the error is a timeout.
	///
	/// A timeout is terminal for the connection, just like other transfer errors,
	/// but a supervisor may want to wait longer before reconnecting.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Transfer(TransferError::Timeout(_)))
	}

	/// Check if the error is caused by using a closed connection.
	pub fn is_connection_closed(&self) -> bool {
		matches!(self, Self::ConnectionClosed(_))
	}
}

impl TransferError {
	/// Classify an I/O error from a transport that signals expired deadlines with `TimedOut` or `WouldBlock`.
	pub fn from_io(error: std::io::Error, operation: Operation, timeout: Duration) -> Self {
		match error.kind() {
			std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Self::Timeout(Timeout { operation, timeout }),
			_ => Self::Io(error),
		}
	}
}

impl InvalidResponse {
	pub fn new(reason: impl Into<String>) -> Self {
		Self { reason: reason.into() }
	}
}

impl std::error::Error for OpenError {}
impl std::error::Error for CommandError {}
impl std::error::Error for TransferError {}
impl std::error::Error for UnknownDriver {}
impl std::error::Error for InvalidDevice {}
impl std::error::Error for ConnectionClosed {}
impl std::error::Error for Timeout {}
impl std::error::Error for InvalidResponse {}

impl From<UnknownDriver> for OpenError {
	fn from(other: UnknownDriver) -> Self {
		Self::UnknownDriver(other)
	}
}

impl From<InvalidDevice> for OpenError {
	fn from(other: InvalidDevice) -> Self {
		Self::InvalidDevice(other)
	}
}

impl From<std::io::Error> for OpenError {
	fn from(other: std::io::Error) -> Self {
		Self::Io(other)
	}
}

impl From<ConnectionClosed> for CommandError {
	fn from(other: ConnectionClosed) -> Self {
		Self::ConnectionClosed(other)
	}
}

impl From<TransferError> for CommandError {
	fn from(other: TransferError) -> Self {
		Self::Transfer(other)
	}
}

impl From<Timeout> for CommandError {
	fn from(other: Timeout) -> Self {
		Self::Transfer(other.into())
	}
}

impl From<InvalidResponse> for CommandError {
	fn from(other: InvalidResponse) -> Self {
		Self::Transfer(other.into())
	}
}

impl From<std::io::Error> for TransferError {
	fn from(other: std::io::Error) -> Self {
		Self::Io(other)
	}
}

impl From<Timeout> for TransferError {
	fn from(other: Timeout) -> Self {
		Self::Timeout(other)
	}
}

impl From<InvalidResponse> for TransferError {
	fn from(other: InvalidResponse) -> Self {
		Self::InvalidResponse(other)
	}
}

impl std::fmt::Display for OpenError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::UnknownDriver(e) => write!(f, "{}", e),
			Self::InvalidDevice(e) => write!(f, "{}", e),
			Self::Io(e) => write!(f, "failed to open device: {}", e),
		}
	}
}

impl std::fmt::Display for CommandError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::ConnectionClosed(e) => write!(f, "{}", e),
			Self::Transfer(e) => write!(f, "{}", e),
		}
	}
}

impl std::fmt::Display for TransferError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Io(e) => write!(f, "transfer failed: {}", e),
			Self::Timeout(e) => write!(f, "{}", e),
			Self::InvalidResponse(e) => write!(f, "{}", e),
		}
	}
}

impl std::fmt::Display for UnknownDriver {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "unknown driver {:?} (is it registered?)", self.name)
	}
}

impl std::fmt::Display for InvalidDevice {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{}: invalid device {:?}: {}", self.driver, self.device, self.reason)
	}
}

impl std::fmt::Display for ConnectionClosed {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{}: connection is closed", self.driver)
	}
}

impl std::fmt::Display for Operation {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Read => write!(f, "read"),
			Self::Write => write!(f, "write"),
		}
	}
}

impl std::fmt::Display for Timeout {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{} timed out after {:?}", self.operation, self.timeout)
	}
}

impl std::fmt::Display for InvalidResponse {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "invalid response: {}", self.reason)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn classify_io_timeouts() {
		let timeout = Duration::from_secs(5);
		let error = TransferError::from_io(std::io::ErrorKind::TimedOut.into(), Operation::Write, timeout);
		assert!(let TransferError::Timeout(Timeout { operation: Operation::Write, .. }) = error);

		let error = TransferError::from_io(std::io::ErrorKind::WouldBlock.into(), Operation::Read, timeout);
		assert!(let TransferError::Timeout(_) = error);

		let error = TransferError::from_io(std::io::ErrorKind::ConnectionRefused.into(), Operation::Read, timeout);
		assert!(let TransferError::Io(_) = error);
	}

	#[test]
	fn command_error_kinds() {
		let closed = CommandError::from(ConnectionClosed { driver: "mock" });
		assert!(closed.is_connection_closed());
		assert!(!closed.is_timeout());
		assert!(closed.to_string() == "mock: connection is closed");

		let timeout = CommandError::from(Timeout {
			operation: Operation::Write,
			timeout: Duration::from_secs(5),
		});
		assert!(timeout.is_timeout());
		assert!(timeout.to_string() == "write timed out after 5s");
	}
}
