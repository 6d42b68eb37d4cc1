use std::sync::Arc;
use std::time::Duration;

use crate::{mock, retroarch};

/// Environment variable that enables the mock driver.
pub const ENV_MOCK_ENABLE: &str = "SNES_LINK_MOCK_ENABLE";

/// Environment variable with the comma separated `host:port` list probed by the RetroArch driver.
pub const ENV_RETROARCH_HOSTS: &str = "SNES_LINK_RETROARCH_HOSTS";

/// Environment variable with the RetroArch per-line deadline in milliseconds.
pub const ENV_RETROARCH_TIMEOUT_MS: &str = "SNES_LINK_RETROARCH_TIMEOUT_MS";

/// Environment variable with the FX Pak Pro serial timeout in milliseconds.
pub const ENV_FXPAKPRO_TIMEOUT_MS: &str = "SNES_LINK_FXPAKPRO_TIMEOUT_MS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for the built-in drivers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
	/// Register the mock driver.
	pub mock_enable: bool,

	/// The `host:port` pairs probed by the RetroArch driver.
	pub retroarch_hosts: Vec<String>,

	/// The deadline for every line sent to RetroArch.
	pub retroarch_timeout: Duration,

	/// The read and write timeout of the FX Pak Pro serial port.
	pub fxpakpro_timeout: Duration,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			mock_enable: false,
			retroarch_hosts: vec![String::from(retroarch::DEFAULT_HOST)],
			retroarch_timeout: DEFAULT_TIMEOUT,
			fxpakpro_timeout: DEFAULT_TIMEOUT,
		}
	}
}

impl Config {
	/// Read the configuration from the environment of the process.
	pub fn from_env() -> Self {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Read the configuration from a variable lookup function.
	///
	/// Missing variables keep their default value.
	/// Invalid values are logged and ignored.
	pub fn from_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();
		if let Some(value) = lookup(ENV_MOCK_ENABLE) {
			config.mock_enable = is_truthy(&value);
		}
		if let Some(value) = lookup(ENV_RETROARCH_HOSTS) {
			let hosts: Vec<String> = value
				.split(',')
				.map(str::trim)
				.filter(|x| !x.is_empty())
				.map(String::from)
				.collect();
			if hosts.is_empty() {
				warn!("ignoring {}: no hosts in {:?}", ENV_RETROARCH_HOSTS, value);
			} else {
				config.retroarch_hosts = hosts;
			}
		}
		if let Some(timeout) = parse_millis(&lookup, ENV_RETROARCH_TIMEOUT_MS) {
			config.retroarch_timeout = timeout;
		}
		if let Some(timeout) = parse_millis(&lookup, ENV_FXPAKPRO_TIMEOUT_MS) {
			config.fxpakpro_timeout = timeout;
		}
		config
	}
}

fn parse_millis<F>(lookup: &F, name: &str) -> Option<Duration>
where
	F: Fn(&str) -> Option<String>,
{
	let value = lookup(name)?;
	match value.trim().parse::<u64>() {
		Ok(0) => {
			warn!("ignoring {}: timeout must be at least 1 ms", name);
			None
		},
		Ok(millis) => Some(Duration::from_millis(millis)),
		Err(e) => {
			warn!("ignoring {}: invalid value {:?}: {}", name, value, e);
			None
		},
	}
}

/// Check if an environment variable value means "enabled".
///
/// Accepts `1`, `true`, `yes` and `on`, ignoring case and surrounding whitespace.
pub fn is_truthy(value: &str) -> bool {
	let value = value.trim();
	["1", "true", "yes", "on"].iter().any(|x| value.eq_ignore_ascii_case(x))
}

/// Register every enabled built-in driver in the process-wide registry.
///
/// Call this once during startup.
///
/// # Panics
/// Panics if one of the built-in drivers is already registered.
pub fn register_drivers(config: &Config) {
	#[cfg(feature = "serial2")]
	crate::register(
		crate::fxpakpro::DRIVER_NAME,
		Arc::new(crate::fxpakpro::FxPakDriver::new(config.fxpakpro_timeout)),
	);
	crate::register(
		retroarch::DRIVER_NAME,
		Arc::new(retroarch::RetroArchDriver::new(config.retroarch_hosts.clone(), config.retroarch_timeout)),
	);
	if config.mock_enable {
		crate::register(mock::DRIVER_NAME, Arc::new(mock::MockDriver::new()));
	}
}
