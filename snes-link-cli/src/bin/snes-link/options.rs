use std::path::PathBuf;

/// Read and write the live memory of a running SNES.
///
/// Addresses are in the FX Pak Pro address space (WRAM starts at $F50000)
/// and may be written in decimal, or in hexadecimal with a "0x" or "$" prefix.
#[derive(clap::Parser)]
#[command(version)]
pub struct Options {
	/// Print more log messages (repeat for even more).
	#[arg(long, short, global = true)]
	#[arg(action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Enable the mock driver.
	#[arg(long, global = true)]
	pub mock: bool,

	/// A RetroArch host to probe, as host:port (may be repeated).
	#[arg(long = "retroarch-host", global = true)]
	#[arg(value_name = "HOST:PORT")]
	pub retroarch_hosts: Vec<String>,

	/// The deadline for a single transfer in milliseconds.
	#[arg(long, global = true)]
	#[arg(value_name = "MILLISECONDS")]
	pub timeout: Option<u64>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
	/// List the available drivers.
	Drivers,

	/// List the devices a driver can find.
	Detect {
		/// The driver to use.
		driver: String,
	},

	/// Read memory from a device.
	Read {
		/// The driver to use.
		driver: String,

		/// The display name of the device, or its number in the output of "detect".
		device: String,

		/// The address to read from.
		#[arg(value_parser = parse_address)]
		address: u32,

		/// The number of bytes to read.
		#[arg(value_parser = clap::value_parser!(u16).range(1..=4096))]
		size: u16,
	},

	/// Write bytes to device memory.
	Write {
		/// The driver to use.
		driver: String,

		/// The display name of the device, or its number in the output of "detect".
		device: String,

		/// The address to write to.
		#[arg(value_parser = parse_address)]
		address: u32,

		/// The bytes to write, in hexadecimal.
		#[arg(required = true, value_parser = parse_byte)]
		#[arg(value_name = "BYTE")]
		bytes: Vec<u8>,
	},

	/// Write shell completions to standard output or a file.
	ShellCompletion {
		/// The shell for which to generate completions.
		#[arg(long)]
		shell: clap_complete::Shell,

		/// The file to write the generated completion file to.
		#[arg(long, short)]
		output: Option<PathBuf>,
	},
}

/// Parse a 24-bit address in decimal or prefixed hexadecimal.
pub fn parse_address(input: &str) -> Result<u32, String> {
	let value = if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")).or_else(|| input.strip_prefix('$')) {
		u32::from_str_radix(hex, 16)
	} else {
		input.parse()
	};
	let value = value.map_err(|e| format!("invalid address {:?}: {}", input, e))?;
	if value > snes_link::MAX_ADDRESS {
		return Err(format!("invalid address {:?}: must fit in 24 bits", input));
	}
	Ok(value)
}

/// Parse a byte in hexadecimal, with or without a "0x" prefix.
pub fn parse_byte(input: &str) -> Result<u8, String> {
	let hex = input.strip_prefix("0x").unwrap_or(input);
	u8::from_str_radix(hex, 16).map_err(|e| format!("invalid byte {:?}: {}", input, e))
}
