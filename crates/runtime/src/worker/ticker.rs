//! Render ticker: pushes the current frame to the display at a fixed cadence,
//! independent of how fast frames arrive.

use std::sync::Arc;

use tracing::debug;

use crate::session::Session;

pub(crate) fn run(session: Arc<Session>) {
	let id = session.id();
	let interval = session.config().render_interval;
	debug!(target = "pmon.worker", %id, ?interval, "render ticker started");

	while session.lifecycle().wait_runnable() {
		let Some(display) = session.display_sink() else {
			break;
		};
		if let Some(frame) = session.current_frame() {
			display.show_frame(id, session.client_name(), &frame);
		}
		drop(display);

		if !session.lifecycle().sleep(interval) {
			break;
		}
	}

	debug!(target = "pmon.worker", %id, "render ticker exited");
}
