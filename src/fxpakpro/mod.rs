//! Driver for the FX Pak Pro (SD2SNES) flash cart over its USB-serial interface.
//!
//! The cart shows up as a USB CDC serial port.
//! Memory is accessed with vectored transfers:
//! a 64-byte control frame holding up to eight `(size, address)` descriptors,
//! followed by the payloads of all requests in 64-byte data frames.

pub mod protocol;
mod queue;

pub use queue::{Connection, FxPakQueue};

/// The name of the driver in the registry.
pub const DRIVER_NAME: &str = "fxpakpro";

#[cfg(feature = "serial2")]
pub use driver::FxPakDriver;

#[cfg(feature = "serial2")]
mod driver {
	use std::path::Path;
	use std::time::Duration;

	use super::{FxPakQueue, DRIVER_NAME};
	use crate::serial_port::serial2;
	use crate::{DeviceDescriptor, Driver, DriverDescriptor, InvalidDevice, OpenError, Queue};

	/// Finds FX Pak Pro carts on the serial ports of the system.
	#[derive(Debug, Clone)]
	pub struct FxPakDriver {
		timeout: Duration,
	}

	impl FxPakDriver {
		/// Create a driver that uses `timeout` for every transfer on an opened port.
		pub fn new(timeout: Duration) -> Self {
			Self { timeout }
		}
	}

	impl Driver for FxPakDriver {
		fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn Queue>, OpenError> {
			if device.id.is_empty() {
				return Err(InvalidDevice {
					driver: DRIVER_NAME,
					device: device.to_string(),
					reason: String::from("no serial port path"),
				}
				.into());
			}
			debug!("fxpakpro: opening {}", device.id);
			let port = serial2::open(&device.id, self.timeout)?;
			Ok(Box::new(FxPakQueue::new(port, self.timeout)))
		}

		fn detect(&self) -> std::io::Result<Vec<DeviceDescriptor>> {
			let devices: Vec<DeviceDescriptor> = serial2::available_ports()?
				.into_iter()
				.filter(|path| is_usb_modem(path))
				.map(|path| {
					let id = path.display().to_string();
					DeviceDescriptor::new(id.clone(), id)
				})
				.collect();
			debug!("fxpakpro: detected {} port(s)", devices.len());
			Ok(devices)
		}

		fn info(&self) -> Option<DriverDescriptor> {
			Some(DriverDescriptor {
				display_order: 0,
				display_name: String::from("FX Pak Pro"),
				description: String::from("Connect to an FX Pak Pro or SD2SNES over USB"),
			})
		}
	}

	/// Check if a serial port can be a USB CDC device.
	///
	/// The cart never shows up as a built-in UART.
	pub(super) fn is_usb_modem(path: &Path) -> bool {
		let Some(name) = path.file_name().and_then(|x| x.to_str()) else {
			return false;
		};
		if cfg!(target_os = "linux") {
			name.starts_with("ttyACM")
		} else if cfg!(target_os = "macos") {
			name.starts_with("cu.usbmodem") || name.starts_with("tty.usbmodem")
		} else {
			true
		}
	}

}
