//! Control loop: reads the text channel after the handshake.

use std::sync::Arc;

use pmon_protocol::ControlToken;
use tracing::{debug, trace};

use super::{Session, TerminationCause};
use crate::channel::TextChannel;

pub(super) fn run(session: Arc<Session>, text: Arc<TextChannel>) {
	debug!(target = "pmon.session", id = %session.id, client = %session.name, "control loop started");

	loop {
		match text.read_line() {
			Ok(line) => match ControlToken::parse(&line) {
				Some(ControlToken::ClientExited) => {
					debug!(target = "pmon.session", id = %session.id, client = %session.name, "client announced exit");
					session.terminate(TerminationCause::RemoteExit);
					break;
				}
				Some(token) => {
					// Parent-to-client tokens echoed back carry no meaning here.
					debug!(target = "pmon.session", id = %session.id, %token, "ignoring unexpected control token");
				}
				None => {
					trace!(target = "pmon.session", id = %session.id, len = line.len(), "chat line");
					session.forward_chat(&line);
				}
			},
			Err(err) => {
				if !session.is_winding_down() {
					session.report(&err);
					session.terminate(TerminationCause::Disconnected);
				}
				break;
			}
		}
	}

	debug!(target = "pmon.session", id = %session.id, client = %session.name, "control loop exited");
}
