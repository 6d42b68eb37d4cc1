//! Driver for RetroArch over its UDP network command interface.
//!
//! RetroArch must run with `network_cmd_enable = "true"`.
//! Memory is written with `WRITE_CORE_RAM` and read with `READ_CORE_RAM` lines,
//! both addressed on the SNES bus of a LoROM cartridge.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use crate::{DeviceDescriptor, Driver, DriverDescriptor, InvalidDevice, Link, OpenError, Queue};

mod client;
mod queue;

pub use client::{LineTransport, UdpClient};
pub use queue::{encode_read_line, encode_write_line, parse_read_reply, RetroArchQueue};

/// The name of the driver in the registry.
pub const DRIVER_NAME: &str = "retroarch";

/// The default address of the network command interface.
pub const DEFAULT_HOST: &str = "localhost:55355";

/// How long to wait for the reply to a detection probe.
pub const DETECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Finds RetroArch instances on a list of configured hosts.
///
/// The driver keeps one socket per host.
/// Opening a device hands that socket to the queue, and detection keeps using it afterwards.
pub struct RetroArchDriver<T = UdpClient> {
	hosts: Vec<String>,
	timeout: Duration,
	connect: Box<dyn Fn(&str) -> std::io::Result<T> + Send + Sync>,
	clients: Mutex<HashMap<String, CachedClient<T>>>,
}

struct CachedClient<T> {
	transport: Arc<T>,

	/// The link of the queue that currently uses the transport, if any.
	owner: Weak<Link<T>>,

	/// The version reported by the last successful probe.
	version: String,
}

impl RetroArchDriver<UdpClient> {
	/// Create a driver that probes the given `host:port` pairs.
	///
	/// `timeout` is the deadline for every line sent by an opened queue.
	pub fn new(hosts: Vec<String>, timeout: Duration) -> Self {
		Self::with_connector(hosts, timeout, UdpClient::connect)
	}
}

impl<T: LineTransport + 'static> RetroArchDriver<T> {
	/// Create a driver with a custom way to connect transports.
	pub fn with_connector<F>(hosts: Vec<String>, timeout: Duration, connect: F) -> Self
	where
		F: Fn(&str) -> std::io::Result<T> + Send + Sync + 'static,
	{
		Self {
			hosts,
			timeout,
			connect: Box::new(connect),
			clients: Mutex::new(HashMap::new()),
		}
	}

	/// The hosts probed by [`Driver::detect()`].
	pub fn hosts(&self) -> &[String] {
		&self.hosts
	}

	/// Get the cached transport for a host, connecting a new one if needed.
	///
	/// Also returns true if an open queue is using the transport.
	fn client(&self, clients: &mut HashMap<String, CachedClient<T>>, host: &str) -> std::io::Result<(Arc<T>, bool)> {
		if let Some(cached) = clients.get(host) {
			let in_use = cached.owner.upgrade().is_some_and(|link| !link.is_closed());
			return Ok((cached.transport.clone(), in_use));
		}
		let transport = Arc::new((self.connect)(host)?);
		clients.insert(host.to_owned(), CachedClient {
			transport: transport.clone(),
			owner: Weak::new(),
			version: String::new(),
		});
		Ok((transport, false))
	}

	fn lock_clients(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedClient<T>>> {
		self.clients.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Ask a host for its version.
	///
	/// A host with an open queue is not probed, since the probe would steal replies from the queue.
	/// The version of the last probe is reported instead, so the device looks the same to a watcher.
	fn probe(&self, host: &str) -> std::io::Result<Option<String>> {
		let transport = {
			let mut clients = self.lock_clients();
			let (transport, in_use) = self.client(&mut clients, host)?;
			if in_use {
				return Ok(Some(clients.get(host).map(|x| x.version.clone()).unwrap_or_default()));
			}
			transport
		};

		transport.send_timeout(b"VERSION\n", DETECT_TIMEOUT)?;
		let deadline = Instant::now() + DETECT_TIMEOUT;
		let mut buffer = [0; 64];
		let version = loop {
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				return Ok(None);
			}
			match transport.recv_timeout(&mut buffer, remaining) {
				Ok(len) => {
					let message = String::from_utf8_lossy(&buffer[..len]);
					// A late reply to a read that timed out in an earlier queue.
					if message.starts_with("READ_CORE_RAM") {
						debug!("retroarch: ignoring stale message from {}: {:?}", host, message.trim_end());
						continue;
					}
					break message.trim().to_owned();
				},
				Err(e) if matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock) => return Ok(None),
				// Nobody listening on the port.
				Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(None),
				Err(e) => return Err(e),
			}
		};

		if let Some(cached) = self.lock_clients().get_mut(host) {
			cached.version = version.clone();
		}
		Ok(Some(version))
	}
}

impl<T: LineTransport + 'static> Driver for RetroArchDriver<T> {
	fn open(&self, device: &DeviceDescriptor) -> Result<Box<dyn Queue>, OpenError> {
		if device.id.is_empty() {
			return Err(InvalidDevice {
				driver: DRIVER_NAME,
				device: device.to_string(),
				reason: String::from("no host"),
			}
			.into());
		}
		let mut clients = self.lock_clients();
		let (transport, in_use) = self.client(&mut clients, &device.id)?;
		if in_use {
			return Err(InvalidDevice {
				driver: DRIVER_NAME,
				device: device.id.clone(),
				reason: String::from("device is already open"),
			}
			.into());
		}

		debug!("retroarch: opening {}", device.id);
		let queue = RetroArchQueue::new(transport, self.timeout);
		if let Some(cached) = clients.get_mut(&device.id) {
			cached.owner = Arc::downgrade(queue.link());
		}
		Ok(Box::new(queue))
	}

	fn detect(&self) -> std::io::Result<Vec<DeviceDescriptor>> {
		let mut devices = Vec::new();
		for host in &self.hosts {
			match self.probe(host) {
				Ok(Some(version)) if version.is_empty() => {
					devices.push(DeviceDescriptor::new(host.clone(), format!("RetroArch ({})", host)));
				},
				Ok(Some(version)) => {
					devices.push(DeviceDescriptor::new(host.clone(), format!("RetroArch {} ({})", version, host)));
				},
				Ok(None) => trace!("retroarch: no reply from {}", host),
				Err(e) => warn!("retroarch: failed to probe {}: {}", host, e),
			}
		}
		debug!("retroarch: detected {} instance(s)", devices.len());
		Ok(devices)
	}

	fn info(&self) -> Option<DriverDescriptor> {
		Some(DriverDescriptor {
			display_order: 1,
			display_name: String::from("RetroArch"),
			description: String::from("Connect to RetroArch over its UDP network command interface"),
		})
	}
}

impl<T> std::fmt::Debug for RetroArchDriver<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RetroArchDriver")
			.field("hosts", &self.hosts)
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}
