use std::path::Path;

use crate::config::{MonitorConfig, default_path};
use crate::error::Result;

/// Prints the effective configuration as JSON, preceded by where it came from.
pub fn execute(config: &MonitorConfig, source: Option<&Path>) -> Result<()> {
	match (source, default_path()) {
		(Some(path), _) => println!("# loaded from {}", path.display()),
		(None, Some(path)) => println!("# defaults ({} not found)", path.display()),
		(None, None) => println!("# defaults"),
	}
	let json = serde_json::to_string_pretty(config).map_err(anyhow::Error::from)?;
	println!("{json}");
	Ok(())
}
