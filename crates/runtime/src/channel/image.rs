use std::fmt;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pmon_protocol::{DEFAULT_MAX_FRAME_LEN, read_frame};

use super::Endpoint;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::transport::{Transport, TransportReader, tcp};

/// Receives length-prefixed encoded frames pushed by the client.
pub struct ImageChannel {
	endpoint: Endpoint,
	reader: Mutex<Option<BufReader<TransportReader>>>,
	max_frame_len: u32,
}

impl ImageChannel {
	/// Connects to the client's image port.
	pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
		let stream = tcp::connect(host, port, timeout)?;
		Ok(Self::new(Arc::new(stream)))
	}

	pub fn new(transport: Arc<dyn Transport>) -> Self {
		let reader = BufReader::new(TransportReader(Arc::clone(&transport)));
		Self {
			endpoint: Endpoint::new(transport),
			reader: Mutex::new(Some(reader)),
			max_frame_len: DEFAULT_MAX_FRAME_LEN,
		}
	}

	pub fn with_max_frame_len(mut self, max: u32) -> Self {
		self.max_frame_len = max;
		self
	}

	/// True while the connection is open and its read path exists.
	pub fn is_active(&self) -> bool {
		!self.endpoint.is_closed()
	}

	/// Blocks until one whole frame has arrived, then decodes it.
	///
	/// Decoding happens after the read lock is released, so a slow decode
	/// never delays `close()` from dropping the read buffer.
	pub fn read_frame(&self) -> Result<Frame> {
		let payload = {
			let mut guard = self.reader.lock();
			let Some(reader) = guard.as_mut().filter(|_| self.is_active()) else {
				return Err(Error::channel_closed());
			};
			match read_frame(reader, self.max_frame_len) {
				Ok(payload) => payload,
				Err(err) => {
					if !self.is_active() {
						*guard = None;
					}
					return Err(err.into());
				}
			}
		};
		Frame::decode(&payload)
	}

	/// Idempotent. Returns `true` for the call that actually closed.
	pub fn close(&self) -> bool {
		if !self.endpoint.close("image") {
			return false;
		}
		// A reader blocked in `read_frame` holds the lock and drops the buffer
		// itself on the way out.
		if let Some(mut guard) = self.reader.try_lock() {
			*guard = None;
		}
		true
	}
}

impl fmt::Display for ImageChannel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.endpoint, f)
	}
}

#[cfg(test)]
mod tests {
	use std::io::{self, Cursor};
	use std::thread;

	use ::image::{ImageFormat, RgbaImage};
	use pmon_protocol::write_frame;

	use super::*;
	use crate::transport::memory::MemoryTransport;

	fn png(width: u32, height: u32) -> Vec<u8> {
		let mut out = Cursor::new(Vec::new());
		RgbaImage::new(width, height).write_to(&mut out, ImageFormat::Png).unwrap();
		out.into_inner()
	}

	fn channel() -> (ImageChannel, MemoryTransport) {
		let (local, remote) = MemoryTransport::pair("image");
		(ImageChannel::new(Arc::new(local)), remote)
	}

	#[test]
	fn reads_decoded_frames_in_order() {
		let (channel, remote) = channel();
		write_frame(&mut &remote, &png(3, 2)).unwrap();
		write_frame(&mut &remote, &png(5, 1)).unwrap();

		let first = channel.read_frame().unwrap();
		assert_eq!((first.width(), first.height()), (3, 2));
		let second = channel.read_frame().unwrap();
		assert_eq!((second.width(), second.height()), (5, 1));
	}

	#[test]
	fn corrupt_payload_is_decode_error_and_stream_stays_aligned() {
		let (channel, remote) = channel();
		write_frame(&mut &remote, b"not a png at all").unwrap();
		write_frame(&mut &remote, &png(2, 2)).unwrap();

		assert!(channel.read_frame().unwrap_err().is_decode());
		assert_eq!(channel.read_frame().unwrap().width(), 2);
	}

	#[test]
	fn oversized_length_is_invalid_data() {
		let (channel, remote) = channel();
		let channel = channel.with_max_frame_len(16);
		write_frame(&mut &remote, &[0u8; 17]).unwrap();

		let err = channel.read_frame().unwrap_err();
		assert_eq!(err.io_kind(), Some(io::ErrorKind::InvalidData));
	}

	#[test]
	fn severed_mid_frame_is_io_error() {
		let (channel, remote) = channel();
		Transport::write_all(&remote, &[0, 0, 0, 100, 1, 2, 3]).unwrap();
		Transport::shutdown(&remote).unwrap();

		let err = channel.read_frame().unwrap_err();
		assert_eq!(err.io_kind(), Some(io::ErrorKind::UnexpectedEof));
	}

	#[test]
	fn close_unblocks_pending_read() {
		let (channel, _remote) = channel();
		let channel = Arc::new(channel);

		let reader = {
			let channel = Arc::clone(&channel);
			thread::spawn(move || channel.read_frame())
		};

		thread::sleep(Duration::from_millis(30));
		assert!(channel.close());
		assert!(!channel.close());

		let err = reader.join().unwrap().unwrap_err();
		assert!(err.io_kind().is_some());
		assert!(!channel.is_active());
		assert!(channel.reader.lock().is_none(), "read buffer released");
	}

	#[test]
	fn display_shows_peer_until_closed() {
		let (channel, _remote) = channel();
		assert_eq!(channel.to_string(), "memory:image/local");
		channel.close();
		assert_eq!(channel.to_string(), "not connected");
		assert_eq!(channel.read_frame().unwrap_err().io_kind(), Some(io::ErrorKind::NotConnected));
	}
}
