//! A driver for a fake SNES backed by memory, for tests and development without hardware.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{
	make_commands,
	BatchCompletion,
	ClosedSignal,
	Command,
	CommandError,
	CommandSequence,
	DeviceDescriptor,
	Driver,
	DriverDescriptor,
	InvalidDevice,
	KeepAlive,
	Link,
	OpenError,
	Queue,
	ReadRequest,
	WriteRequest,
	MAX_ADDRESS,
};

/// The name of the driver in the registry.
pub const DRIVER_NAME: &str = "mock";

/// The id of the only device of the driver.
pub const DEVICE_ID: &str = "mock";

/// The memory of a fake SNES: the full 16 MiB FX Pak address space.
///
/// Memory that was never written reads as zero.
/// Clones share the same memory.
#[derive(Debug, Clone, Default)]
pub struct Memory {
	bytes: Arc<Mutex<HashMap<u32, u8>>>,
}

/// Provides a single fake device.
///
/// Every queue opened by the driver shares the memory of the driver.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
	memory: Memory,
}

/// A queue that reads and writes [`Memory`] directly.
#[derive(Debug)]
pub struct MockQueue {
	link: Arc<Link<Memory>>,
}

struct ReadCommand {
	batch: Vec<ReadRequest>,
}

struct WriteCommand {
	batch: Vec<WriteRequest>,
}

impl Memory {
	/// Create zeroed memory.
	pub fn new() -> Self {
		Self::default()
	}

	/// Read `size` bytes starting at `address`, wrapping at the end of the address space.
	pub fn read(&self, address: u32, size: usize) -> Vec<u8> {
		let bytes = self.lock();
		(0..size)
			.map(|i| bytes.get(&wrap(address, i)).copied().unwrap_or(0))
			.collect()
	}

	/// Write `data` starting at `address`, wrapping at the end of the address space.
	pub fn write(&self, address: u32, data: &[u8]) {
		let mut bytes = self.lock();
		for (i, &byte) in data.iter().enumerate() {
			bytes.insert(wrap(address, i), byte);
		}
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, u8>> {
		self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

fn wrap(address: u32, offset: usize) -> u32 {
	(address as usize + offset) as u32 & MAX_ADDRESS
}

impl MockDriver {
	/// Create a driver with zeroed memory.
	pub fn new() -> Self {
		Self::default()
	}

	/// Get the memory of the fake device.
	pub fn memory(&self) -> &Memory {
		&self.memory
	}
}

impl Driver for MockDriver {
	fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn Queue>, OpenError> {
		if device.id != DEVICE_ID {
			return Err(InvalidDevice {
				driver: DRIVER_NAME,
				device: device.id.clone(),
				reason: format!("the only device is {:?}", DEVICE_ID),
			}
			.into());
		}
		Ok(Box::new(MockQueue::new(self.memory.clone())))
	}

	fn detect(&self) -> std::io::Result<Vec<DeviceDescriptor>> {
		Ok(vec![DeviceDescriptor::new(DEVICE_ID, "Mock Device")])
	}

	fn info(&self) -> Option<DriverDescriptor> {
		Some(DriverDescriptor {
			display_order: 1000,
			display_name: String::from("Mock Device"),
			description: String::from("Connect to a mock SNES device for testing"),
		})
	}
}

impl MockQueue {
	/// Create a queue for the given memory.
	pub fn new(memory: Memory) -> Self {
		Self {
			link: Arc::new(Link::new(DRIVER_NAME, memory)),
		}
	}
}

impl Queue for MockQueue {
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

	fn is_terminal_error(&self, _error: &CommandError) -> bool {
		false
	}
}

impl Command<Memory> for ReadCommand {
	fn len(&self) -> usize {
		self.batch.len()
	}

	fn is_write(&self) -> bool {
		false
	}

	fn execute(self: Box<Self>, link: &Link<Memory>, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		let memory = link.handle()?;
		keep_alive.pulse();
		for request in self.batch {
			let data = memory.read(request.address, request.size.into());
			request.complete(data);
		}
		Ok(())
	}
}

impl Command<Memory> for WriteCommand {
	fn len(&self) -> usize {
		self.batch.len()
	}

	fn is_write(&self) -> bool {
		true
	}

	fn execute(self: Box<Self>, link: &Link<Memory>, keep_alive: &KeepAlive) -> Result<(), CommandError> {
		let memory = link.handle()?;
		keep_alive.pulse();
		for request in self.batch {
			memory.write(request.address, &request.data);
			request.complete();
		}
		Ok(())
	}
}
