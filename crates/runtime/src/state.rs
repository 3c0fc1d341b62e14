//! Session lifecycle state shared by the control loop and both workers.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Where a session is in its lifecycle.
///
/// Transitions only move forward, except for the `Active` / `Paused` toggle:
///
/// ```text
/// Connecting -> Active <-> Paused
///      \          |          |
///       `-------> Terminated <'
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
	Connecting,
	Active,
	Paused,
	Terminated,
}

impl SessionState {
	pub fn as_str(self) -> &'static str {
		match self {
			SessionState::Connecting => "connecting",
			SessionState::Active => "active",
			SessionState::Paused => "paused",
			SessionState::Terminated => "terminated",
		}
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// State plus the condition workers park on.
pub(crate) struct Lifecycle {
	state: Mutex<SessionState>,
	changed: Condvar,
}

impl Lifecycle {
	pub(crate) fn new() -> Self {
		Self {
			state: Mutex::new(SessionState::Connecting),
			changed: Condvar::new(),
		}
	}

	pub(crate) fn state(&self) -> SessionState {
		*self.state.lock()
	}

	pub(crate) fn is_terminated(&self) -> bool {
		self.state() == SessionState::Terminated
	}

	/// `Connecting -> Active`. Any other starting state is left alone.
	pub(crate) fn activate(&self) -> bool {
		let mut state = self.state.lock();
		if *state != SessionState::Connecting {
			return false;
		}
		*state = SessionState::Active;
		self.changed.notify_all();
		true
	}

	/// Toggles between `Active` and `Paused`. Returns whether anything changed.
	pub(crate) fn set_paused(&self, paused: bool) -> bool {
		let mut state = self.state.lock();
		let next = match (*state, paused) {
			(SessionState::Active, true) => SessionState::Paused,
			(SessionState::Paused, false) => SessionState::Active,
			_ => return false,
		};
		*state = next;
		self.changed.notify_all();
		true
	}

	/// Moves to `Terminated` and wakes every waiter. Returns `false` if the
	/// state was already terminal.
	pub(crate) fn terminate(&self) -> bool {
		let mut state = self.state.lock();
		if *state == SessionState::Terminated {
			return false;
		}
		*state = SessionState::Terminated;
		self.changed.notify_all();
		true
	}

	/// Parks while the session is connecting or paused.
	///
	/// Returns `true` once the session is `Active`, `false` once terminated.
	pub(crate) fn wait_runnable(&self) -> bool {
		let mut state = self.state.lock();
		loop {
			match *state {
				SessionState::Active => return true,
				SessionState::Terminated => return false,
				SessionState::Connecting | SessionState::Paused => self.changed.wait(&mut state),
			}
		}
	}

	/// Sleeps for `duration` unless terminated first.
	///
	/// Returns `false` if the session terminated before or during the sleep.
	pub(crate) fn sleep(&self, duration: Duration) -> bool {
		let deadline = Instant::now() + duration;
		let mut state = self.state.lock();
		while *state != SessionState::Terminated {
			if self.changed.wait_until(&mut state, deadline).timed_out() {
				return *state != SessionState::Terminated;
			}
		}
		false
	}
}
