//! Error types for the session runtime.

use std::io;

use pmon_protocol::HandshakeError;
use thiserror::Error;

/// Result alias used throughout the runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by channels and sessions.
///
/// `Connect` and the handshake variants are returned synchronously to the
/// caller constructing a session. Everything else happens inside a live
/// session, where it is reported to the error sink and, for `Io`, ends that
/// session only.
#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to connect to {addr}: {source}")]
	Connect {
		addr: String,
		#[source]
		source: io::Error,
	},

	#[error("malformed handshake: {0}")]
	Handshake(#[from] HandshakeError),

	#[error("handshake could not be read: {0}")]
	HandshakeIo(#[source] io::Error),

	#[error("session I/O failed: {0}")]
	Io(#[from] io::Error),

	#[error("failed to decode {len}-byte frame: {source}")]
	Decode {
		len: usize,
		#[source]
		source: image::ImageError,
	},

	#[error("{0:?} is a reserved control token and cannot be sent as chat")]
	ReservedToken(String),

	#[error("session already terminated")]
	Terminated,
}

impl Error {
	/// Returns `true` for errors that prevented a session from being established.
	pub fn is_handshake(&self) -> bool {
		matches!(self, Error::Handshake(_) | Error::HandshakeIo(_))
	}

	/// Returns `true` for a frame whose payload was not a decodable image.
	pub fn is_decode(&self) -> bool {
		matches!(self, Error::Decode { .. })
	}

	/// I/O error kind when this is a transport failure.
	pub fn io_kind(&self) -> Option<io::ErrorKind> {
		match self {
			Error::Io(err) | Error::HandshakeIo(err) | Error::Connect { source: err, .. } => Some(err.kind()),
			_ => None,
		}
	}

	pub(crate) fn channel_closed() -> Self {
		Error::Io(io::Error::new(io::ErrorKind::NotConnected, "channel closed"))
	}
}
