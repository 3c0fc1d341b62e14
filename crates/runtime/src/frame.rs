//! Decoded frames and the snapshot records built from them.

use std::sync::Arc;

use chrono::{DateTime, Local};
use image::RgbaImage;

use crate::error::{Error, Result};

/// A decoded screen capture.
#[derive(Debug, Clone)]
pub struct Frame {
	image: RgbaImage,
	encoded_len: usize,
	received_at: DateTime<Local>,
}

impl Frame {
	/// Decodes a frame payload in any format the `image` crate can detect.
	pub fn decode(payload: &[u8]) -> Result<Self> {
		let image = image::load_from_memory(payload).map_err(|source| Error::Decode {
			len: payload.len(),
			source,
		})?;
		Ok(Self::from_image(image.to_rgba8(), payload.len()))
	}

	pub fn from_image(image: RgbaImage, encoded_len: usize) -> Self {
		Self {
			image,
			encoded_len,
			received_at: Local::now(),
		}
	}

	pub fn image(&self) -> &RgbaImage {
		&self.image
	}

	pub fn width(&self) -> u32 {
		self.image.width()
	}

	pub fn height(&self) -> u32 {
		self.image.height()
	}

	/// Size of the payload this frame was decoded from.
	pub fn encoded_len(&self) -> usize {
		self.encoded_len
	}

	pub fn received_at(&self) -> DateTime<Local> {
		self.received_at
	}
}

/// A frame captured on operator request, ready for archiving.
#[derive(Debug, Clone)]
pub struct Snapshot {
	pub client: String,
	pub title: String,
	pub taken_at: DateTime<Local>,
	pub frame: Arc<Frame>,
}

impl Snapshot {
	pub fn new(client: impl Into<String>, frame: Arc<Frame>, taken_at: DateTime<Local>) -> Self {
		let client = client.into();
		let title = format!("{client} Screenshot [{}]", taken_at.timestamp_millis());
		Self {
			client,
			title,
			taken_at,
			frame,
		}
	}
}
