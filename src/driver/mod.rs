//! Transport drivers and the process-wide driver registry.

use std::sync::Arc;

use crate::{OpenError, Queue};

mod registry;
mod watcher;

pub use registry::{driver_by_name, driver_infos, drivers, open, register, Registry};
pub use watcher::DeviceWatcher;

/// A transport: finds devices and opens connections to them.
pub trait Driver: Send + Sync {
	/// Open a connection to a specific device.
	fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn Queue>, OpenError>;

	/// Detect the devices that are currently present.
	fn detect(&self) -> std::io::Result<Vec<DeviceDescriptor>>;

	/// Get a descriptor with all fields empty.
	fn empty(&self) -> DeviceDescriptor {
		DeviceDescriptor::default()
	}

	/// Get the display metadata of the driver, if it has any.
	///
	/// See [`DriverDescriptor::fallback()`] for the values used when a driver returns `None`.
	fn info(&self) -> Option<DriverDescriptor> {
		None
	}
}

/// Identifies one device within a transport.
///
/// Descriptors compare by value, so two scans can be compared to find out if the set of devices changed.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct DeviceDescriptor {
	/// The identity of the device, for example a serial port path or a `host:port` pair.
	pub id: String,

	/// A human readable name for the device.
	pub display_name: String,
}

/// Display metadata of a driver.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DriverDescriptor {
	/// Sort key for listing drivers, lower first.
	pub display_order: i32,

	/// A human readable name for the driver.
	pub display_name: String,

	/// A short description of the driver.
	pub description: String,
}

/// A registered driver together with its name and resolved display metadata.
#[derive(Clone)]
pub struct NamedDriver {
	pub name: String,
	pub driver: Arc<dyn Driver>,
	pub info: DriverDescriptor,
}

impl DeviceDescriptor {
	/// Create a new descriptor.
	pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			display_name: display_name.into(),
		}
	}
}

impl DriverDescriptor {
	/// The metadata used for a driver that does not provide any.
	pub fn fallback(name: &str) -> Self {
		Self {
			display_order: 0,
			display_name: name.to_owned(),
			description: format!("{} driver", name),
		}
	}
}

impl std::fmt::Display for DeviceDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		if self.display_name.is_empty() {
			write!(f, "{}", self.id)
		} else {
			write!(f, "{}", self.display_name)
		}
	}
}

impl std::fmt::Debug for NamedDriver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NamedDriver")
			.field("name", &self.name)
			.field("info", &self.info)
			.finish_non_exhaustive()
	}
}
