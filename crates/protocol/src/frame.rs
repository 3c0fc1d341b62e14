//! Length-prefixed framing for the image channel.
//!
//! Every frame is a 4-byte big-endian payload length `L` followed by exactly
//! `L` bytes of encoded image data. The remote pushes frames unprompted; the
//! parent never writes on this channel outside of tests.

use std::io::{self, Read, Write};

/// Size of the big-endian length prefix in front of every frame.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload accepted when the caller does not configure a limit.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 32 * 1024 * 1024;

/// Reads one frame payload from `reader`.
///
/// A declared length of zero or above `max_len` is reported as
/// [`io::ErrorKind::InvalidData`]: the stream can no longer be trusted to be
/// aligned on a frame boundary. A connection severed mid-frame surfaces as
/// [`io::ErrorKind::UnexpectedEof`].
pub fn read_frame<R: Read>(reader: &mut R, max_len: u32) -> io::Result<Vec<u8>> {
	let mut header = [0u8; FRAME_HEADER_LEN];
	reader.read_exact(&mut header)?;

	let len = u32::from_be_bytes(header);
	if len == 0 || len > max_len {
		return Err(io::Error::new(
			io::ErrorKind::InvalidData,
			format!("frame length {len} outside accepted range 1..={max_len}"),
		));
	}

	let mut payload = vec![0u8; len as usize];
	reader.read_exact(&mut payload)?;
	Ok(payload)
}

/// Writes `payload` as one frame and flushes the writer.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
	let len = u32::try_from(payload.len())
		.map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("frame payload of {} bytes does not fit a u32 prefix", payload.len())))?;

	writer.write_all(&len.to_be_bytes())?;
	writer.write_all(payload)?;
	writer.flush()
}
