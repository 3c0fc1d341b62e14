mod config;
pub mod watch;

use std::path::PathBuf;

use crate::cli::Commands;
use crate::config::MonitorConfig;
use crate::error::Result;

pub async fn dispatch(command: Commands, config_path: Option<PathBuf>) -> Result<()> {
	let (config, source) = MonitorConfig::load(config_path.as_deref())?;
	match command {
		Commands::Watch(args) => watch::execute(args, config).await,
		Commands::Config => config::execute(&config, source.as_deref()),
	}
}
