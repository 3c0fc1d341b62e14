//! Single-entry, last-write-wins holder for the newest decoded frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::frame::Frame;

#[derive(Default)]
struct SlotState {
	frame: Option<Arc<Frame>>,
	sealed: bool,
}

#[derive(Default)]
pub(crate) struct FrameSlot {
	state: RwLock<SlotState>,
	received: AtomicU64,
}

impl FrameSlot {
	/// Replaces the current frame. Returns `false` once the slot is sealed.
	pub(crate) fn store(&self, frame: Frame) -> bool {
		let mut state = self.state.write();
		if state.sealed {
			return false;
		}
		state.frame = Some(Arc::new(frame));
		self.received.fetch_add(1, Ordering::Relaxed);
		true
	}

	pub(crate) fn latest(&self) -> Option<Arc<Frame>> {
		self.state.read().frame.clone()
	}

	/// Drops the current frame and refuses any later store.
	pub(crate) fn seal(&self) {
		let mut state = self.state.write();
		state.sealed = true;
		state.frame = None;
	}

	/// Frames stored over the slot's lifetime.
	pub(crate) fn received(&self) -> u64 {
		self.received.load(Ordering::Relaxed)
	}
}
