//! Tunables for channels and session workers.

use std::time::Duration;

use pmon_protocol::DEFAULT_MAX_FRAME_LEN;

/// Per-session settings, shared by both channels and all workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
	/// Bound on establishing each transport connection. Also used as the
	/// text channel's write timeout so a close notice cannot hang teardown.
	pub connect_timeout: Duration,
	/// Redraw cadence of the render ticker.
	pub render_interval: Duration,
	/// Largest frame payload accepted on the image channel.
	pub max_frame_len: u32,
	/// Consecutive undecodable frames tolerated before the session is
	/// dropped. `0` tolerates any number.
	pub max_consecutive_decode_errors: u32,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			connect_timeout: Duration::from_millis(2000),
			render_interval: Duration::from_millis(50),
			max_frame_len: DEFAULT_MAX_FRAME_LEN,
			max_consecutive_decode_errors: 10,
		}
	}
}

impl SessionConfig {
	pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	pub fn with_render_interval(mut self, interval: Duration) -> Self {
		self.render_interval = interval;
		self
	}

	pub fn with_max_frame_len(mut self, max: u32) -> Self {
		self.max_frame_len = max;
		self
	}

	pub fn with_max_consecutive_decode_errors(mut self, max: u32) -> Self {
		self.max_consecutive_decode_errors = max;
		self
	}

	/// Whether `failures` consecutive decode errors should end the session.
	pub(crate) fn decode_limit_reached(&self, failures: u32) -> bool {
		self.max_consecutive_decode_errors != 0 && failures >= self.max_consecutive_decode_errors
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_reference_cadence() {
		let config = SessionConfig::default();
		assert_eq!(config.render_interval, Duration::from_millis(50));
		assert_eq!(config.max_consecutive_decode_errors, 10);
	}

	#[test]
	fn zero_decode_limit_never_trips() {
		let config = SessionConfig::default().with_max_consecutive_decode_errors(0);
		assert!(!config.decode_limit_reached(u32::MAX));

		let config = config.with_max_consecutive_decode_errors(3);
		assert!(!config.decode_limit_reached(2));
		assert!(config.decode_limit_reached(3));
	}
}
