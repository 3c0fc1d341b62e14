use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error(transparent)]
	Session(#[from] pmon_runtime::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
