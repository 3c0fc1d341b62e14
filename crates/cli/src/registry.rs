//! Live sessions, in connection order.

use std::sync::Arc;

use parking_lot::Mutex;
use pmon_runtime::Session;
use pmon_runtime::SessionId;
use pmon_runtime::sink::SessionRegistry;
use tracing::debug;

/// Ordered list of live sessions.
///
/// Sessions remove themselves through [`SessionRegistry::remove`] while
/// terminating. Methods that act on sessions clone them out first and never
/// call into a session while the table lock is held.
#[derive(Default)]
pub struct SessionTable {
	sessions: Mutex<Vec<Arc<Session>>>,
}

impl SessionTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an established session. A session that already began terminating
	/// is not added.
	pub fn insert(&self, session: Arc<Session>) -> bool {
		let mut sessions = self.sessions.lock();
		if session.termination_cause().is_some() {
			return false;
		}
		debug!(target = "pmon.registry", id = %session.id(), client = session.client_name(), "session registered");
		sessions.push(session);
		true
	}

	pub fn len(&self) -> usize {
		self.sessions.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.lock().is_empty()
	}

	/// Snapshot of the current sessions.
	pub fn list(&self) -> Vec<Arc<Session>> {
		self.sessions.lock().clone()
	}

	/// Session at the 1-based position shown by `/list`.
	pub fn get(&self, index: usize) -> Option<Arc<Session>> {
		index.checked_sub(1).and_then(|i| self.sessions.lock().get(i).cloned())
	}

	/// Resumes the session at `index` and pauses every other one.
	pub fn select(&self, index: usize) -> Option<Arc<Session>> {
		let selected = self.get(index)?;
		for session in self.list() {
			session.set_paused(session.id() != selected.id());
		}
		Some(selected)
	}

	/// Asks every session to close. Returns how many this call terminated.
	pub fn close_all(&self) -> usize {
		self.list().into_iter().filter(|session| session.request_close()).count()
	}
}

impl SessionRegistry for SessionTable {
	fn remove(&self, session: SessionId) {
		let mut sessions = self.sessions.lock();
		sessions.retain(|entry| entry.id() != session);
		debug!(target = "pmon.registry", id = %session, remaining = sessions.len(), "session removed");
	}
}
