use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pmon")]
#[command(about = "Watch parent-monitor clients: live screen, chat and controls")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Configuration file (defaults to <config dir>/pmon/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Connect to clients and read operator commands from stdin
	Watch(WatchArgs),

	/// Print the effective configuration
	Config,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
	/// Client hosts to connect to
	#[arg(required = true, value_name = "HOST")]
	pub hosts: Vec<String>,

	/// Port of the image channel
	#[arg(long, value_name = "PORT")]
	pub image_port: Option<u16>,

	/// Port of the text channel
	#[arg(long, value_name = "PORT")]
	pub text_port: Option<u16>,

	/// Directory snapshots are written to
	#[arg(long, value_name = "DIR")]
	pub snapshot_dir: Option<PathBuf>,

	/// File history lines are appended to
	#[arg(long, value_name = "FILE")]
	pub history_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn command_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_watch_with_overrides() {
		let cli = Cli::try_parse_from([
			"pmon",
			"-vv",
			"watch",
			"10.0.0.5",
			"kid-laptop",
			"--image-port",
			"6000",
			"--snapshot-dir",
			"/tmp/snaps",
		])
		.unwrap();

		assert_eq!(cli.verbose, 2);
		let Commands::Watch(args) = cli.command else {
			panic!("expected watch");
		};
		assert_eq!(args.hosts, vec!["10.0.0.5", "kid-laptop"]);
		assert_eq!(args.image_port, Some(6000));
		assert_eq!(args.text_port, None);
		assert_eq!(args.snapshot_dir, Some(PathBuf::from("/tmp/snaps")));
	}

	#[test]
	fn watch_requires_a_host() {
		assert!(Cli::try_parse_from(["pmon", "watch"]).is_err());
	}

	#[test]
	fn global_config_flag_after_subcommand() {
		let cli = Cli::try_parse_from(["pmon", "config", "--config", "custom.json"]).unwrap();
		assert!(matches!(cli.command, Commands::Config));
		assert_eq!(cli.config, Some(PathBuf::from("custom.json")));
	}
}
