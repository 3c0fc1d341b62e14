//! Frame retriever: image channel into the current-frame slot.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::channel::ImageChannel;
use crate::error::Error;
use crate::session::{Session, TerminationCause};

pub(crate) fn run(session: Arc<Session>, image: Arc<ImageChannel>) {
	let id = session.id();
	debug!(target = "pmon.worker", %id, "frame retriever started");

	let mut failures = 0u32;
	while session.lifecycle().wait_runnable() {
		match image.read_frame() {
			Ok(frame) => {
				failures = 0;
				trace!(target = "pmon.worker", %id, width = frame.width(), height = frame.height(), bytes = frame.encoded_len(), "frame");
				if !session.store_frame(frame) {
					break;
				}
			}
			Err(err @ Error::Decode { .. }) => {
				failures += 1;
				session.report(&err);
				if session.config().decode_limit_reached(failures) {
					warn!(target = "pmon.worker", %id, failures, "too many undecodable frames");
					session.terminate(TerminationCause::DecodeFailures);
					break;
				}
			}
			Err(err) => {
				if !session.is_winding_down() {
					session.report(&err);
					session.terminate(TerminationCause::Disconnected);
				}
				break;
			}
		}
	}

	debug!(target = "pmon.worker", %id, "frame retriever exited");
}
