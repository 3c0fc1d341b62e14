use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::Endpoint;
use crate::error::{Error, Result};
use crate::transport::{Transport, TransportReader, tcp};

/// Longest line accepted from a client, excluding the terminator.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

/// Newline-delimited UTF-8 messages in both directions. Invalid UTF-8 from
/// the client is decoded lossily.
pub struct TextChannel {
	endpoint: Endpoint,
	reader: Mutex<Option<BufReader<TransportReader>>>,
	writer: Mutex<()>,
}

impl TextChannel {
	/// Connects to the client's text port.
	///
	/// `timeout` also bounds each write, so a close notice to an unresponsive
	/// client cannot stall teardown.
	pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
		let stream = tcp::connect(host, port, timeout)?;
		stream.set_write_timeout(Some(timeout)).map_err(|source| Error::Connect {
			addr: format!("{host}:{port}"),
			source,
		})?;
		Ok(Self::new(Arc::new(stream)))
	}

	pub fn new(transport: Arc<dyn Transport>) -> Self {
		let reader = BufReader::new(TransportReader(Arc::clone(&transport)));
		Self {
			endpoint: Endpoint::new(transport),
			reader: Mutex::new(Some(reader)),
			writer: Mutex::new(()),
		}
	}

	pub fn is_active(&self) -> bool {
		!self.endpoint.is_closed()
	}

	/// Blocks for one message, returned without its `\n` or `\r\n`.
	///
	/// A final line cut off by EOF is still returned; EOF with nothing
	/// buffered is [`io::ErrorKind::UnexpectedEof`].
	pub fn read_line(&self) -> Result<String> {
		let mut guard = self.reader.lock();
		let Some(reader) = guard.as_mut().filter(|_| self.is_active()) else {
			return Err(Error::channel_closed());
		};

		let mut buf = Vec::new();
		let read = reader.by_ref().take(MAX_LINE_LEN as u64 + 1).read_until(b'\n', &mut buf);
		// `close()` could not take the lock while this read was blocked.
		if !self.is_active() {
			*guard = None;
		}
		drop(guard);
		let read = read?;

		if read == 0 {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "text channel closed by peer").into());
		}
		if buf.last() == Some(&b'\n') {
			buf.pop();
			if buf.last() == Some(&b'\r') {
				buf.pop();
			}
		} else if buf.len() > MAX_LINE_LEN {
			return Err(io::Error::new(io::ErrorKind::InvalidData, format!("line exceeds {MAX_LINE_LEN} bytes")).into());
		}

		Ok(String::from_utf8_lossy(&buf).into_owned())
	}

	/// Writes `text` plus a newline as a single write and flushes.
	pub fn send_line(&self, text: &str) -> Result<()> {
		if text.contains(['\n', '\r']) {
			return Err(io::Error::new(io::ErrorKind::InvalidInput, "message must not contain a line break").into());
		}
		if !self.is_active() {
			return Err(Error::channel_closed());
		}

		let mut line = Vec::with_capacity(text.len() + 1);
		line.extend_from_slice(text.as_bytes());
		line.push(b'\n');

		let _writer = self.writer.lock();
		self.endpoint.transport.write_all(&line)?;
		self.endpoint.transport.flush()?;
		Ok(())
	}

	/// Idempotent. Returns `true` for the call that actually closed.
	pub fn close(&self) -> bool {
		if !self.endpoint.close("text") {
			return false;
		}
		if let Some(mut guard) = self.reader.try_lock() {
			*guard = None;
		}
		true
	}
}

impl fmt::Display for TextChannel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.endpoint, f)
	}
}

impl fmt::Debug for TextChannel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TextChannel").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use std::thread;

	use super::*;
	use crate::transport::memory::{MemoryTransport, TransportEvent};

	fn channel() -> (TextChannel, Arc<MemoryTransport>, MemoryTransport) {
		let (local, remote) = MemoryTransport::pair("text");
		let local = Arc::new(local);
		(TextChannel::new(local.clone()), local, remote)
	}

	#[test]
	fn reads_lines_and_strips_terminators() {
		let (channel, _local, remote) = channel();
		Transport::write_all(&remote, b"USERNAME->alice\r\nhello there\npartial").unwrap();
		Transport::shutdown(&remote).unwrap();

		assert_eq!(channel.read_line().unwrap(), "USERNAME->alice");
		assert_eq!(channel.read_line().unwrap(), "hello there");
		assert_eq!(channel.read_line().unwrap(), "partial");
		assert_eq!(channel.read_line().unwrap_err().io_kind(), Some(io::ErrorKind::UnexpectedEof));
	}

	#[test]
	fn invalid_utf8_is_replaced_not_rejected() {
		let (channel, _local, remote) = channel();
		Transport::write_all(&remote, b"caf\xe9 ok?\nnext\n").unwrap();
		assert_eq!(channel.read_line().unwrap(), "caf\u{FFFD} ok?");
		assert_eq!(channel.read_line().unwrap(), "next");
	}

	#[test]
	fn unterminated_line_over_limit_is_invalid_data() {
		let (channel, _local, remote) = channel();
		Transport::write_all(&remote, &vec![b'x'; MAX_LINE_LEN + 1]).unwrap();

		let err = channel.read_line().unwrap_err();
		assert_eq!(err.io_kind(), Some(io::ErrorKind::InvalidData));
	}

	#[test]
	fn line_at_limit_is_accepted() {
		let (channel, _local, remote) = channel();
		let mut line = vec![b'y'; MAX_LINE_LEN];
		line.push(b'\n');
		Transport::write_all(&remote, &line).unwrap();

		assert_eq!(channel.read_line().unwrap().len(), MAX_LINE_LEN);
	}

	#[test]
	fn connect_stage_failures_are_connect_errors() {
		let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
		let port = listener.local_addr().unwrap().port();

		let err = TextChannel::connect("127.0.0.1", port, Duration::ZERO).unwrap_err();
		assert!(matches!(err, Error::Connect { .. }), "unexpected error: {err}");
		assert_eq!(err.io_kind(), Some(io::ErrorKind::InvalidInput));
	}

	#[test]
	fn send_line_writes_one_terminated_message() {
		let (channel, local, remote) = channel();
		channel.send_line("CLOSE_CLIENT").unwrap();

		assert_eq!(local.events(), vec![TransportEvent::Write(b"CLOSE_CLIENT\n".to_vec())]);
		let mut line = String::new();
		BufReader::new(&remote).read_line(&mut line).unwrap();
		assert_eq!(line, "CLOSE_CLIENT\n");
	}

	#[test]
	fn embedded_newline_is_rejected_before_writing() {
		let (channel, local, _remote) = channel();
		let err = channel.send_line("two\nlines").unwrap_err();
		assert_eq!(err.io_kind(), Some(io::ErrorKind::InvalidInput));
		assert!(local.events().is_empty());
	}

	#[test]
	fn concurrent_senders_do_not_interleave() {
		let (channel, local, _remote) = channel();
		let channel = Arc::new(channel);

		let senders: Vec<_> = (0..8)
			.map(|n| {
				let channel = Arc::clone(&channel);
				thread::spawn(move || {
					for i in 0..20 {
						channel.send_line(&format!("sender {n} message {i}")).unwrap();
					}
				})
			})
			.collect();
		for sender in senders {
			sender.join().unwrap();
		}

		let written = String::from_utf8(local.written()).unwrap();
		let lines: Vec<_> = written.lines().collect();
		assert_eq!(lines.len(), 160);
		assert!(lines.iter().all(|line| line.starts_with("sender ") && line.contains(" message ")));
	}

	#[test]
	fn close_unblocks_reader_and_rejects_sends() {
		let (channel, local, _remote) = channel();
		let channel = Arc::new(channel);

		let reader = {
			let channel = Arc::clone(&channel);
			thread::spawn(move || channel.read_line())
		};

		thread::sleep(Duration::from_millis(30));
		assert!(channel.close());
		assert!(!channel.close());
		assert!(reader.join().unwrap().is_err());
		assert!(channel.reader.lock().is_none(), "read buffer released");

		assert_eq!(channel.send_line("late").unwrap_err().io_kind(), Some(io::ErrorKind::NotConnected));
		assert_eq!(local.events(), vec![TransportEvent::Shutdown]);
	}
}
