use env_logger::fmt::Color;

/// Install the logger.
///
/// Messages of the CLI and the library are shown from `Info` upwards, more with each `-v`.
/// Everything else only shows warnings and errors.
/// `RUST_LOG` is applied on top, so `RUST_LOG=snes_link::retroarch=trace` still works.
pub fn init(root_module: &str, verbosity: i8) {
	use std::io::Write;

	let log_level = match verbosity {
		i8::MIN..=0 => log::LevelFilter::Info,
		1 => log::LevelFilter::Debug,
		_ => log::LevelFilter::Trace,
	};

	env_logger::Builder::new()
		.format(|buffer, record: &log::Record| {
			let (prefix, color) = prefix(record.level());
			let mut prefix_style = buffer.style();
			if let Some(color) = color {
				prefix_style.set_color(color).set_bold(true);
			}
			writeln!(buffer, "{}{}", prefix_style.value(prefix), record.args())
		})
		.filter_level(log::LevelFilter::Warn)
		.filter_module(root_module, log_level)
		.filter_module("snes_link", log_level)
		.parse_default_env()
		.init();
}

fn prefix(level: log::Level) -> (&'static str, Option<Color>) {
	match level {
		log::Level::Trace => ("Trace: ", None),
		log::Level::Debug | log::Level::Info => ("", None),
		log::Level::Warn => ("Warning: ", Some(Color::Yellow)),
		log::Level::Error => ("Error: ", Some(Color::Red)),
	}
}
