use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use snes_link::{Config, DeviceDescriptor, Dispatcher, Driver, KeepAlive, ReadRequest, Response, ResponseChannel, WriteRequest};

mod logging;
mod options;

use options::{Command, Options};

/// The largest request the drivers accept.
const MAX_REQUEST_SIZE: usize = u8::MAX as usize;

fn main() {
	if let Err(()) = do_main(clap::Parser::parse()) {
		std::process::exit(1);
	}
}

fn do_main(options: Options) -> Result<(), ()> {
	logging::init(module_path!(), options.verbose as i8);
	if let Command::ShellCompletion { shell, output } = &options.command {
		return write_shell_completion(*shell, output.as_deref());
	}

	let config = make_config(&options);
	log::debug!("Using configuration: {:?}", config);
	snes_link::register_drivers(&config);

	match &options.command {
		Command::Drivers => {
			for named in snes_link::driver_infos() {
				log::info!("{}: {}", named.name, named.info.display_name);
				log::info!(" └─ {}", named.info.description);
			}
		},
		Command::Detect { driver } => {
			let devices = detect(&*find_driver(driver)?, driver)?;
			if devices.is_empty() {
				log::warn!("No devices found by driver {}", driver);
			}
			for (i, device) in devices.iter().enumerate() {
				log::info!("{}: {}", i + 1, device.display_name);
				log::info!(" └─ {}", device.id);
			}
		},
		Command::Read { driver, device, address, size } => {
			let dispatcher = open_device(driver, device)?;
			let (responses, received) = ResponseChannel::new();
			let requests: Vec<ReadRequest> = chunks(*address, usize::from(*size))
				.map(|(address, size)| ReadRequest::new(address, size as u8).with_completion(responses.completion()))
				.collect();
			log::debug!("Reading {} bytes at ${:06X} in {} request(s)", size, address, requests.len());

			let start = Instant::now();
			let result = dispatcher.read(requests, None).wait();
			close(&dispatcher);
			result.map_err(|e| log::error!("Read failed: {}", e))?;
			let elapsed = start.elapsed();

			let responses: Vec<Response> = received.try_iter().collect();
			for response in &responses {
				log_hex_dump(response);
			}
			log::debug!("{:?}: read {} response(s)", elapsed, responses.len());
		},
		Command::Write { driver, device, address, bytes } => {
			let dispatcher = open_device(driver, device)?;
			let (responses, received) = ResponseChannel::new();
			let requests: Vec<WriteRequest> = bytes
				.chunks(MAX_REQUEST_SIZE)
				.zip(chunks(*address, bytes.len()))
				.map(|(data, (address, _))| WriteRequest::new(address, data.to_vec()).with_completion(responses.completion()))
				.collect();
			log::debug!("Writing {} bytes at ${:06X} in {} request(s)", bytes.len(), address, requests.len());

			let start = Instant::now();
			let result = dispatcher.write(requests, None).wait();
			close(&dispatcher);
			result.map_err(|e| log::error!("Write failed: {}", e))?;
			let written: usize = received.try_iter().map(|x| x.data.len()).sum();
			log::info!("{:?}: wrote {} bytes at ${:06X}", start.elapsed(), written, address);
		},
		// Handled before the drivers are registered.
		Command::ShellCompletion { .. } => (),
	}
	Ok(())
}

fn make_config(options: &Options) -> Config {
	let mut config = Config::from_env();
	config.mock_enable |= options.mock;
	if !options.retroarch_hosts.is_empty() {
		config.retroarch_hosts = options.retroarch_hosts.clone();
	}
	if let Some(timeout) = options.timeout {
		config.retroarch_timeout = Duration::from_millis(timeout.max(1));
		config.fxpakpro_timeout = Duration::from_millis(timeout.max(1));
	}
	config
}

fn find_driver(name: &str) -> Result<Arc<dyn Driver>, ()> {
	snes_link::driver_by_name(name).ok_or_else(|| {
		log::error!("Unknown driver: {}", name);
		log::error!("Available drivers: {}", snes_link::drivers().join(", "));
	})
}

fn detect(driver: &dyn Driver, name: &str) -> Result<Vec<DeviceDescriptor>, ()> {
	driver.detect().map_err(|e| log::error!("Failed to detect devices for driver {}: {}", name, e))
}

/// Find a device by display name, id, or 1-based index in the detected devices.
fn select_device(devices: Vec<DeviceDescriptor>, selector: &str) -> Option<DeviceDescriptor> {
	if let Ok(index) = selector.parse::<usize>() {
		if index >= 1 && index <= devices.len() {
			return devices.into_iter().nth(index - 1);
		}
	}
	devices.into_iter().find(|x| x.display_name == selector || x.id == selector)
}

fn open_device(driver_name: &str, selector: &str) -> Result<Dispatcher, ()> {
	let driver = find_driver(driver_name)?;
	let device = select_device(detect(&*driver, driver_name)?, selector)
		.ok_or_else(|| log::error!("No device {:?} found by driver {}", selector, driver_name))?;
	log::debug!("Opening {} ({}) with driver {}", device.display_name, device.id, driver_name);
	let queue = snes_link::open(driver_name, &device).map_err(|e| log::error!("Failed to open {}: {}", device, e))?;
	Dispatcher::new(queue, KeepAlive::disabled()).map_err(|e| log::error!("Failed to start dispatcher: {}", e))
}

fn close(dispatcher: &Dispatcher) {
	if let Err(e) = dispatcher.close() {
		log::warn!("Failed to close connection: {}", e);
	}
}

/// Split a memory range into (address, size) pieces that fit in a single request.
fn chunks(address: u32, size: usize) -> impl Iterator<Item = (u32, usize)> {
	(0..size).step_by(MAX_REQUEST_SIZE).map(move |offset| {
		let len = (size - offset).min(MAX_REQUEST_SIZE);
		((address + offset as u32) & snes_link::MAX_ADDRESS, len)
	})
}

fn log_hex_dump(response: &Response) {
	for (i, line) in response.data.chunks(16).enumerate() {
		let address = (response.address + i as u32 * 16) & snes_link::MAX_ADDRESS;
		let hex: Vec<String> = line.iter().map(|x| format!("{:02X}", x)).collect();
		log::info!("${:06X}: {}", address, hex.join(" "));
	}
}

fn write_shell_completion(shell: clap_complete::Shell, path: Option<&Path>) -> Result<(), ()> {
	use clap::CommandFactory;
	use std::io::Write;

	let mut buffer = Vec::with_capacity(4 * 1024);

	let mut command = Options::command();
	clap_complete::generate(shell, &mut command, env!("CARGO_BIN_NAME"), &mut buffer);
	if !buffer.ends_with(b"\n") {
		buffer.push(b'\n');
	}

	let path = path.unwrap_or_else(|| Path::new("-"));
	if path == Path::new("-") {
		log::debug!("Writing shell completion for {} to stdout", shell);
		let stdout = std::io::stdout();
		stdout
			.lock()
			.write_all(&buffer)
			.map_err(|e| log::error!("Failed to write to stdout: {}", e))?;
	} else {
		log::debug!("Writing shell completion for {} to {}", shell, path.display());
		let mut output = std::fs::File::create(path).map_err(|e| log::error!("Failed to create {}: {}", path.display(), e))?;
		output
			.write_all(&buffer)
			.map_err(|e| log::error!("Failed to write to {}: {}", path.display(), e))?;
	}

	Ok(())
}
