//! Read and write the live memory of a running SNES through interchangeable transports.
//!
//! Two transports are built in:
//! * [`fxpakpro`]: the USB-serial protocol of the FX Pak Pro (SD2SNES) flash cart.
//! * [`retroarch`]: the UDP line protocol of the RetroArch network command interface.
//!
//! A [`mock`] transport backed by memory is available for testing.
//!
//! Transports are registered by name in a process-wide registry (see [`register()`] and [`register_drivers()`]).
//! Opening a device gives a [`Queue`] that turns [`ReadRequest`]s and [`WriteRequest`]s into a [`CommandSequence`]
//! of protocol-legal batches.
//! All commands for one queue must be executed by a single serial dispatch point, normally a [`Dispatcher`].
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use snes_link::{Config, Dispatcher, KeepAlive, ReadRequest, ResponseChannel};
//!
//! snes_link::register_drivers(&Config::from_env());
//! let driver = snes_link::driver_by_name("fxpakpro").ok_or("fxpakpro driver not registered")?;
//! let device = driver.detect()?.into_iter().next().ok_or("no device found")?;
//!
//! let dispatcher = Dispatcher::new(snes_link::open("fxpakpro", &device)?, KeepAlive::disabled())?;
//! let (responses, received) = ResponseChannel::new();
//! dispatcher.read(vec![ReadRequest::new(0xF5_0010, 2).with_completion(responses.completion())], None).wait()?;
//! println!("{:02X?}", received.recv()?.data);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

mod config;
mod driver;
mod endian;
mod error;
mod queue;
mod request;

pub mod fxpakpro;
pub mod lorom;
pub mod mock;
pub mod retroarch;
pub mod serial_port;

pub use config::{is_truthy, register_drivers, Config};
pub use driver::*;
pub use error::*;
pub use queue::*;
pub use request::*;
pub use serial_port::SerialPort;
