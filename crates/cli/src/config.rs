//! Operator configuration file.
//!
//! JSON, read from `--config` or `<config dir>/pmon/config.json`. Every field
//! is optional; a missing default file means defaults. Command-line flags
//! are applied on top via [`MonitorConfig::apply_watch_args`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use pmon_protocol::DEFAULT_MAX_FRAME_LEN;
use pmon_runtime::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::cli::WatchArgs;
use crate::error::{CliError, Result};

pub const DEFAULT_IMAGE_PORT: u16 = 5050;
pub const DEFAULT_TEXT_PORT: u16 = 5051;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
	pub image_port: u16,
	pub text_port: u16,
	pub connect_timeout_ms: u64,
	pub render_interval_ms: u64,
	pub max_frame_bytes: u32,
	/// `0` keeps sessions alive through any number of bad frames.
	pub max_consecutive_decode_errors: u32,
	pub snapshot_dir: Option<PathBuf>,
	pub history_file: Option<PathBuf>,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		let session = SessionConfig::default();
		Self {
			image_port: DEFAULT_IMAGE_PORT,
			text_port: DEFAULT_TEXT_PORT,
			connect_timeout_ms: session.connect_timeout.as_millis() as u64,
			render_interval_ms: session.render_interval.as_millis() as u64,
			max_frame_bytes: DEFAULT_MAX_FRAME_LEN,
			max_consecutive_decode_errors: session.max_consecutive_decode_errors,
			snapshot_dir: None,
			history_file: None,
		}
	}
}

/// `<config dir>/pmon/config.json`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("pmon").join("config.json"))
}

impl MonitorConfig {
	/// Loads the explicit file, or the default file if it exists.
	///
	/// Returns the configuration and the path it came from, if any.
	pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
		match explicit {
			Some(path) => Ok((Self::from_file(path)?, Some(path.to_path_buf()))),
			None => match default_path() {
				Some(path) if path.exists() => Ok((Self::from_file(&path)?, Some(path))),
				_ => Ok((Self::default(), None)),
			},
		}
	}

	pub fn from_file(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| match err.kind() {
				io::ErrorKind::NotFound => CliError::Config(format!("config file {} does not exist", path.display())),
				_ => CliError::Io(err),
			})?;
		let config: Self = serde_json::from_str(&raw)
			.with_context(|| format!("failed to parse {}", path.display()))?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<()> {
		if self.image_port == 0 || self.text_port == 0 {
			return Err(CliError::Config("ports must be non-zero".to_string()));
		}
		if self.image_port == self.text_port {
			return Err(CliError::Config(format!("image and text channels cannot share port {}", self.image_port)));
		}
		if self.connect_timeout_ms == 0 {
			return Err(CliError::Config("connect_timeout_ms must be positive".to_string()));
		}
		if self.render_interval_ms == 0 {
			return Err(CliError::Config("render_interval_ms must be positive".to_string()));
		}
		if self.max_frame_bytes == 0 {
			return Err(CliError::Config("max_frame_bytes must be positive".to_string()));
		}
		Ok(())
	}

	/// Applies command-line overrides and re-validates.
	pub fn apply_watch_args(&mut self, args: &WatchArgs) -> Result<()> {
		if let Some(port) = args.image_port {
			self.image_port = port;
		}
		if let Some(port) = args.text_port {
			self.text_port = port;
		}
		if let Some(dir) = &args.snapshot_dir {
			self.snapshot_dir = Some(dir.clone());
		}
		if let Some(file) = &args.history_file {
			self.history_file = Some(file.clone());
		}
		self.validate()
	}

	pub fn session_config(&self) -> SessionConfig {
		SessionConfig::default()
			.with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
			.with_render_interval(Duration::from_millis(self.render_interval_ms))
			.with_max_frame_len(self.max_frame_bytes)
			.with_max_consecutive_decode_errors(self.max_consecutive_decode_errors)
	}

	/// Where snapshots go: the configured directory or `./snapshots`.
	pub fn snapshot_dir(&self) -> PathBuf {
		self.snapshot_dir.clone().unwrap_or_else(|| PathBuf::from("snapshots"))
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	fn write(dir: &TempDir, body: &str) -> PathBuf {
		let path = dir.path().join("config.json");
		fs::write(&path, body).unwrap();
		path
	}

	#[test]
	fn partial_file_fills_in_defaults() {
		let dir = TempDir::new().unwrap();
		let path = write(&dir, r#"{ "image_port": 6000, "render_interval_ms": 100 }"#);

		let (config, source) = MonitorConfig::load(Some(&path)).unwrap();
		assert_eq!(source, Some(path));
		assert_eq!(config.image_port, 6000);
		assert_eq!(config.text_port, DEFAULT_TEXT_PORT);
		assert_eq!(config.session_config().render_interval, Duration::from_millis(100));
		assert_eq!(config.session_config().max_consecutive_decode_errors, 10);
	}

	#[test]
	fn unknown_fields_are_rejected() {
		let dir = TempDir::new().unwrap();
		let path = write(&dir, r#"{ "image_prot": 6000 }"#);

		let err = MonitorConfig::load(Some(&path)).unwrap_err();
		assert!(matches!(err, CliError::Anyhow(_)), "{err}");
	}

	#[test]
	fn explicit_missing_file_is_an_error() {
		let dir = TempDir::new().unwrap();
		let err = MonitorConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
		assert!(matches!(err, CliError::Config(_)), "{err}");
	}

	#[test]
	fn shared_port_is_invalid() {
		let dir = TempDir::new().unwrap();
		let path = write(&dir, r#"{ "image_port": 7000, "text_port": 7000 }"#);
		assert!(matches!(MonitorConfig::from_file(&path), Err(CliError::Config(_))));
	}

	#[test]
	fn zero_durations_are_invalid() {
		let dir = TempDir::new().unwrap();
		for body in [r#"{ "connect_timeout_ms": 0 }"#, r#"{ "render_interval_ms": 0 }"#] {
			let path = write(&dir, body);
			let err = MonitorConfig::from_file(&path).unwrap_err();
			assert!(matches!(err, CliError::Config(_)), "{body}: {err}");
		}
	}

	#[test]
	fn flags_override_file_values() {
		let mut config = MonitorConfig::default();
		let args = WatchArgs {
			hosts: vec!["kid-laptop".into()],
			text_port: Some(7001),
			history_file: Some(PathBuf::from("history.log")),
			..WatchArgs::default()
		};

		config.apply_watch_args(&args).unwrap();
		assert_eq!(config.image_port, DEFAULT_IMAGE_PORT);
		assert_eq!(config.text_port, 7001);
		assert_eq!(config.history_file, Some(PathBuf::from("history.log")));
		assert_eq!(config.snapshot_dir(), PathBuf::from("snapshots"));
	}

	#[test]
	fn defaults_round_trip_through_json() {
		let json = serde_json::to_string(&MonitorConfig::default()).unwrap();
		let parsed: MonitorConfig = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, MonitorConfig::default());
	}
}
