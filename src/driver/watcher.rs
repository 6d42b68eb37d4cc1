use std::sync::Arc;

use super::{DeviceDescriptor, Driver};

/// Tracks the devices of one driver to notice hot-plug events.
///
/// Call [`Self::poll()`] periodically (every two seconds is plenty for USB devices).
pub struct DeviceWatcher {
	driver: Arc<dyn Driver>,
	devices: Vec<DeviceDescriptor>,
}

impl DeviceWatcher {
	/// Create a new watcher and perform the initial scan.
	pub fn new(driver: Arc<dyn Driver>) -> Self {
		let devices = scan(&*driver);
		Self { driver, devices }
	}

	/// The devices found by the most recent scan.
	pub fn devices(&self) -> &[DeviceDescriptor] {
		&self.devices
	}

	/// Scan again and return the new list of devices if it differs from the previous scan.
	///
	/// A failed scan counts as a scan without devices.
	pub fn poll(&mut self) -> Option<&[DeviceDescriptor]> {
		let devices = scan(&*self.driver);
		if devices == self.devices {
			return None;
		}
		debug!("device list changed: {} -> {} device(s)", self.devices.len(), devices.len());
		self.devices = devices;
		Some(&self.devices)
	}
}

fn scan(driver: &dyn Driver) -> Vec<DeviceDescriptor> {
	driver.detect().unwrap_or_else(|e| {
		warn!("failed to detect devices: {}", e);
		Vec::new()
	})
}

impl std::fmt::Debug for DeviceWatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DeviceWatcher")
			.field("devices", &self.devices)
			.finish_non_exhaustive()
	}
}
