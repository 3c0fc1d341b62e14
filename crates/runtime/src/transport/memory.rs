//! In-memory transport for testing channels and sessions without sockets.
//!
//! [`MemoryTransport::pair`] returns two connected ends. Each end records the
//! writes and shutdowns it performs, in order, so tests can assert that a
//! control token was written before the connection was closed.
//!
//! # Example
//!
//! ```ignore
//! let (local, remote) = MemoryTransport::pair("text");
//! let local = Arc::new(local);
//! let channel = TextChannel::new(local.clone());
//!
//! channel.send_line("hello")?;
//! channel.close();
//! assert_eq!(local.events(), vec![
//!     TransportEvent::Write(b"hello\n".to_vec()),
//!     TransportEvent::Shutdown,
//! ]);
//! ```

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::Transport;

/// Something one end of a [`MemoryTransport`] pair did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
	Write(Vec<u8>),
	Shutdown,
}

#[derive(Default)]
struct PipeState {
	buf: VecDeque<u8>,
	closed: bool,
}

/// One direction of the duplex pair.
#[derive(Default)]
struct Pipe {
	state: Mutex<PipeState>,
	readable: Condvar,
}

impl Pipe {
	fn close(&self) {
		self.state.lock().closed = true;
		self.readable.notify_all();
	}
}

/// One end of an in-process duplex byte stream.
pub struct MemoryTransport {
	name: String,
	inbound: Arc<Pipe>,
	outbound: Arc<Pipe>,
	events: Mutex<Vec<TransportEvent>>,
}

impl MemoryTransport {
	/// Creates two connected ends named `<name>/local` and `<name>/remote`.
	pub fn pair(name: &str) -> (Self, Self) {
		let a_to_b = Arc::new(Pipe::default());
		let b_to_a = Arc::new(Pipe::default());

		let local = Self {
			name: format!("{name}/local"),
			inbound: Arc::clone(&b_to_a),
			outbound: Arc::clone(&a_to_b),
			events: Mutex::new(Vec::new()),
		};
		let remote = Self {
			name: format!("{name}/remote"),
			inbound: a_to_b,
			outbound: b_to_a,
			events: Mutex::new(Vec::new()),
		};
		(local, remote)
	}

	/// Everything this end has written or shut down, in order.
	pub fn events(&self) -> Vec<TransportEvent> {
		self.events.lock().clone()
	}

	/// Concatenation of every write performed by this end.
	pub fn written(&self) -> Vec<u8> {
		self.events
			.lock()
			.iter()
			.filter_map(|event| match event {
				TransportEvent::Write(bytes) => Some(bytes.as_slice()),
				TransportEvent::Shutdown => None,
			})
			.flatten()
			.copied()
			.collect()
	}

	/// Whether this end has been shut down.
	pub fn is_shut_down(&self) -> bool {
		self.events.lock().contains(&TransportEvent::Shutdown)
	}
}

impl Transport for MemoryTransport {
	fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}

		let mut state = self.inbound.state.lock();
		while state.buf.is_empty() && !state.closed {
			self.inbound.readable.wait(&mut state);
		}

		let n = buf.len().min(state.buf.len());
		for (slot, byte) in buf.iter_mut().zip(state.buf.drain(..n)) {
			*slot = byte;
		}
		Ok(n)
	}

	fn write_all(&self, buf: &[u8]) -> io::Result<()> {
		let mut state = self.outbound.state.lock();
		if state.closed {
			return Err(io::Error::new(io::ErrorKind::BrokenPipe, format!("{} is closed", self.name)));
		}
		state.buf.extend(buf.iter().copied());
		self.events.lock().push(TransportEvent::Write(buf.to_vec()));
		drop(state);
		self.outbound.readable.notify_all();
		Ok(())
	}

	fn flush(&self) -> io::Result<()> {
		Ok(())
	}

	fn shutdown(&self) -> io::Result<()> {
		self.events.lock().push(TransportEvent::Shutdown);
		self.outbound.close();
		self.inbound.close();
		Ok(())
	}

	fn peer(&self) -> String {
		format!("memory:{}", self.name)
	}
}

impl Read for &MemoryTransport {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		Transport::read(*self, buf)
	}
}

impl Write for &MemoryTransport {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		Transport::write_all(*self, buf)?;
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Transport::flush(*self)
	}
}
