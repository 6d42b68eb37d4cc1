use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use super::{DeviceDescriptor, Driver, DriverDescriptor, NamedDriver};
use crate::{OpenError, Queue, UnknownDriver};

/// A table of drivers by name.
///
/// Drivers are registered once at startup.
/// Afterwards the table is only read.
#[derive(Default)]
pub struct Registry {
	drivers: RwLock<BTreeMap<String, Arc<dyn Driver>>>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

impl Registry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Make a driver available under the given name.
	///
	/// # Panics
	/// Panics if a driver with the same name is already registered.
	/// Two transports must never silently shadow each other.
	pub fn register(&self, name: impl Into<String>, driver: Arc<dyn Driver>) {
		let name = name.into();
		let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
		if drivers.contains_key(&name) {
			panic!("driver registered twice: {:?}", name);
		}
		debug!("registered driver {:?}", name);
		drivers.insert(name, driver);
	}

	/// Get the names of all registered drivers in ascending order.
	pub fn drivers(&self) -> Vec<String> {
		self.read().keys().cloned().collect()
	}

	/// Get a driver by name.
	pub fn driver_by_name(&self, name: &str) -> Option<Arc<dyn Driver>> {
		self.read().get(name).cloned()
	}

	/// Open a device with the named driver.
	pub fn open(&self, name: &str, device: &DeviceDescriptor) -> Result<Box<dyn Queue>, OpenError> {
		let driver = self.driver_by_name(name).ok_or_else(|| UnknownDriver { name: name.to_owned() })?;
		driver.open(device)
	}

	/// Get all drivers with their display metadata, sorted by display order and then by name.
	pub fn driver_infos(&self) -> Vec<NamedDriver> {
		let mut named: Vec<NamedDriver> = self
			.read()
			.iter()
			.map(|(name, driver)| NamedDriver {
				name: name.clone(),
				driver: driver.clone(),
				info: driver.info().unwrap_or_else(|| DriverDescriptor::fallback(name)),
			})
			.collect();
		// Stable sort, and the map is already sorted by name.
		named.sort_by_key(|x| x.info.display_order);
		named
	}

	fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<dyn Driver>>> {
		self.drivers.read().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Make a driver available in the process-wide registry.
///
/// Only call this during startup.
///
/// # Panics
/// Panics if a driver with the same name is already registered.
pub fn register(name: impl Into<String>, driver: Arc<dyn Driver>) {
	REGISTRY.register(name, driver)
}

/// Get the names of all drivers in the process-wide registry in ascending order.
pub fn drivers() -> Vec<String> {
	REGISTRY.drivers()
}

/// Get a driver from the process-wide registry.
pub fn driver_by_name(name: &str) -> Option<Arc<dyn Driver>> {
	REGISTRY.driver_by_name(name)
}

/// Open a device with a driver from the process-wide registry.
pub fn open(name: &str, device: &DeviceDescriptor) -> Result<Box<dyn Queue>, OpenError> {
	REGISTRY.open(name, device)
}

/// Get all drivers of the process-wide registry with their display metadata.
pub fn driver_infos() -> Vec<NamedDriver> {
	REGISTRY.driver_infos()
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Registry").field("drivers", &self.drivers()).finish()
	}
}
