use std::any::Any;
use std::sync::{mpsc, Arc};

/// The highest valid 24-bit address.
pub const MAX_ADDRESS: u32 = 0xFF_FFFF;

/// Callback invoked once with the response to a single request.
pub type Completion = Box<dyn FnOnce(Response) + Send>;

/// Opaque value attached to a write request and echoed in its response.
pub type Extra = Arc<dyn Any + Send + Sync>;

/// A pending memory read.
///
/// The fields are only reachable through [`ReadRequest::new()`] and the accessors,
/// so a request always reads at least one byte from a 24-bit address.
pub struct ReadRequest {
	/// The 24-bit address to read from, in the FX Pak Pro address space.
	pub(crate) address: u32,

	/// The number of bytes to read.
	pub(crate) size: u8,

	/// Called with the read data once the command holding this request executed successfully up to this request.
	pub(crate) completion: Option<Completion>,
}

/// A pending memory write.
///
/// The size always equals the length of the data.
/// A request can not be built with a struct literal:
///
/// ```compile_fail
/// let request = snes_link::WriteRequest {
/// 	address: 0xF5_0000,
/// 	size: 4,
/// 	data: vec![1, 2],
/// 	extra: None,
/// 	completion: None,
/// };
/// ```
pub struct WriteRequest {
	/// The 24-bit address to write to, in the FX Pak Pro address space.
	pub(crate) address: u32,

	/// The number of bytes to write, always equal to `data.len()`.
	pub(crate) size: u8,

	/// The bytes to write.
	pub(crate) data: Vec<u8>,

	/// Opaque value echoed in the response.
	pub(crate) extra: Option<Extra>,

	/// Called once the data has been sent.
	pub(crate) completion: Option<Completion>,
}

/// The result of a single read or write request.
#[derive(Clone)]
pub struct Response {
	/// True if the request was a write.
	pub is_write: bool,

	/// The address of the request.
	pub address: u32,

	/// The size of the request.
	pub size: u8,

	/// The data read, or the data that was written.
	pub data: Vec<u8>,

	/// The opaque value from the write request.
	pub extra: Option<Extra>,
}

/// A sender half that turns completions into messages on a channel.
///
/// This is an alternative to writing completion callbacks by hand:
/// every request gets a completion from [`Self::completion()`],
/// and the caller blocks on the receiver instead.
#[derive(Clone)]
pub struct ResponseChannel {
	sender: mpsc::Sender<Response>,
}

impl ReadRequest {
	/// Create a new read request without a completion callback.
	///
	/// # Panics
	/// Panics if `size` is zero or if `address` does not fit in 24 bits.
	pub fn new(address: u32, size: u8) -> Self {
		check_address(address);
		if size == 0 {
			panic!("invalid read size: a read request must read at least one byte");
		}
		Self {
			address,
			size,
			completion: None,
		}
	}

	/// The address to read from.
	pub fn address(&self) -> u32 {
		self.address
	}

	/// The number of bytes to read.
	pub fn size(&self) -> u8 {
		self.size
	}

	/// Set the completion callback.
	pub fn with_completion(mut self, completion: Completion) -> Self {
		self.completion = Some(completion);
		self
	}

	/// Invoke the completion callback, if any, with the data that was read.
	pub(crate) fn complete(self, data: Vec<u8>) {
		if let Some(completion) = self.completion {
			completion(Response {
				is_write: false,
				address: self.address,
				size: self.size,
				data,
				extra: None,
			});
		}
	}
}

impl WriteRequest {
	/// Create a new write request without a completion callback.
	///
	/// # Panics
	/// Panics if `data` is empty, if it holds more than 255 bytes, or if `address` does not fit in 24 bits.
	pub fn new(address: u32, data: Vec<u8>) -> Self {
		check_address(address);
		let size = match u8::try_from(data.len()) {
			Ok(0) => panic!("invalid write size: a write request must write at least one byte"),
			Ok(size) => size,
			Err(_) => panic!("invalid write size: a write request can write at most 255 bytes, got {}", data.len()),
		};
		Self {
			address,
			size,
			data,
			extra: None,
			completion: None,
		}
	}

	pub fn address(&self) -> u32 {
		self.address
	}

	pub fn size(&self) -> u8 {
		self.size
	}

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	pub fn extra(&self) -> Option<&Extra> {
		self.extra.as_ref()
	}

	/// Attach an opaque value that is echoed in the response.
	pub fn with_extra(mut self, extra: Extra) -> Self {
		self.extra = Some(extra);
		self
	}

	/// Set the completion callback.
	pub fn with_completion(mut self, completion: Completion) -> Self {
		self.completion = Some(completion);
		self
	}

	/// Invoke the completion callback, if any.
	pub(crate) fn complete(self) {
		if let Some(completion) = self.completion {
			completion(Response {
				is_write: true,
				address: self.address,
				size: self.size,
				data: self.data,
				extra: self.extra,
			});
		}
	}
}

impl ResponseChannel {
	/// Create a new channel, returning the sender half and the receiver for the responses.
	pub fn new() -> (Self, mpsc::Receiver<Response>) {
		let (sender, receiver) = mpsc::channel();
		(Self { sender }, receiver)
	}

	/// Make a completion callback that sends the response over the channel.
	pub fn completion(&self) -> Completion {
		let sender = self.sender.clone();
		Box::new(move |response| {
			// The receiver may be gone if the caller lost interest.
			let _ = sender.send(response);
		})
	}
}

fn check_address(address: u32) {
	if address > MAX_ADDRESS {
		panic!("invalid address: {:#08X} does not fit in 24 bits", address);
	}
}

impl std::fmt::Debug for ReadRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ReadRequest")
			.field("address", &format_args!("{:#08X}", self.address))
			.field("size", &self.size)
			.finish_non_exhaustive()
	}
}

impl std::fmt::Debug for WriteRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WriteRequest")
			.field("address", &format_args!("{:#08X}", self.address))
			.field("size", &self.size)
			.field("data", &format_args!("{:02X?}", self.data))
			.finish_non_exhaustive()
	}
}

impl std::fmt::Debug for Response {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Response")
			.field("is_write", &self.is_write)
			.field("address", &format_args!("{:#08X}", self.address))
			.field("size", &self.size)
			.field("data", &format_args!("{:02X?}", self.data))
			.field("extra", &self.extra.is_some())
			.finish()
	}
}
