//! Byte-stream seam underneath the image and text channels.
//!
//! Channels never own a socket directly. They hold an `Arc<dyn Transport>`
//! so that one thread can sit in a blocking read while another shuts the
//! transport down, which is what lets `close()` unblock in-flight reads.
//!
//! Two implementations ship with the crate:
//!
//! * [`std::net::TcpStream`], used for real clients ([`tcp`]);
//! * [`memory::MemoryTransport`], an in-process duplex pair that records
//!   every write and shutdown for tests.

use std::io::{self, Read};
use std::sync::Arc;

pub mod memory;
pub mod tcp;

/// A bidirectional byte stream that can be shut down from any thread.
pub trait Transport: Send + Sync + 'static {
	/// Reads into `buf`, blocking until data, EOF, or shutdown.
	fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

	/// Writes the whole buffer.
	fn write_all(&self, buf: &[u8]) -> io::Result<()>;

	fn flush(&self) -> io::Result<()>;

	/// Shuts both directions down. Blocked readers on this end must return.
	fn shutdown(&self) -> io::Result<()>;

	/// Printable description of the remote end.
	fn peer(&self) -> String;
}

/// [`Read`] adapter so channels can put a `BufReader` over a shared transport.
pub(crate) struct TransportReader(pub(crate) Arc<dyn Transport>);

impl Read for TransportReader {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.0.read(buf)
	}
}
