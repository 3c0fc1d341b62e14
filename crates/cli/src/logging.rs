//! Subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the `-v` derived filter.
pub const LOG_ENV: &str = "PMON_LOG";

/// Default filter directive for a `-v` count.
pub fn default_directive(verbose: u8) -> &'static str {
	match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	}
}

/// Installs a stderr fmt subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_logging(verbose: u8) {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbose >= 2)
		.with_thread_names(verbose >= 2)
		.try_init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_maps_to_levels() {
		assert_eq!(default_directive(0), "warn");
		assert_eq!(default_directive(1), "info");
		assert_eq!(default_directive(2), "debug");
		assert_eq!(default_directive(7), "trace");
	}
}
