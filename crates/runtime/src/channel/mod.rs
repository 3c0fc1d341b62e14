//! The two per-client connections: pushed frames and line-oriented text.
//!
//! Both channels wrap an `Arc<dyn Transport>` and share the same close
//! semantics: `close()` may be called from any thread, any number of times,
//! and the first call shuts the transport down so a thread blocked in a read
//! returns with an I/O error.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::transport::Transport;

mod image;
mod text;

pub use image::ImageChannel;
pub use text::{MAX_LINE_LEN, TextChannel};

/// Transport handle plus the closed flag shared by both channel kinds.
struct Endpoint {
	transport: Arc<dyn Transport>,
	closed: AtomicBool,
	peer: String,
}

impl Endpoint {
	fn new(transport: Arc<dyn Transport>) -> Self {
		let peer = transport.peer();
		Self {
			transport,
			closed: AtomicBool::new(false),
			peer,
		}
	}

	fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	/// Shuts the transport down on the first call only.
	fn close(&self, channel: &'static str) -> bool {
		if self.closed.swap(true, Ordering::AcqRel) {
			return false;
		}
		match self.transport.shutdown() {
			Ok(()) => debug!(target = "pmon.channel", channel, peer = %self.peer, "closed"),
			Err(err) => debug!(target = "pmon.channel", channel, peer = %self.peer, error = %err, "shutdown failed"),
		}
		true
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_closed() { f.write_str("not connected") } else { f.write_str(&self.peer) }
	}
}
