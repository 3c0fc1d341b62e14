//! Outward-facing collaborators a session reports to.
//!
//! A session never talks to a window, a log file or a registry directly. It is
//! handed a [`Sinks`] bundle at construction and drops its references during
//! termination. Every field defaults to a no-op, except errors, which default
//! to `tracing`.

use std::sync::Arc;

use tracing::warn;

use crate::error::Error;
use crate::frame::{Frame, Snapshot};
use crate::session::SessionId;

/// Receives the current frame on every render tick.
pub trait DisplaySink: Send + Sync {
	fn show_frame(&self, session: SessionId, client: &str, frame: &Arc<Frame>);
}

/// Receives chat lines sent by a client.
pub trait ChatSink: Send + Sync {
	fn chat_line(&self, client: &str, line: &str);
}

/// Append-only operator history.
pub trait HistorySink: Send + Sync {
	fn append(&self, line: &str);
}

/// Stores snapshots taken on operator request.
pub trait ArchiveSink: Send + Sync {
	fn store(&self, snapshot: &Snapshot);
}

/// Receives in-session failures that are handled locally.
pub trait ErrorSink: Send + Sync {
	fn report(&self, client: &str, error: &Error);
}

/// The owner's collection of live sessions.
pub trait SessionRegistry: Send + Sync {
	/// Called once, from inside the termination critical section. Must not
	/// call back into the session being removed.
	fn remove(&self, session: SessionId);
}

/// Does nothing with anything it is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl DisplaySink for Discard {
	fn show_frame(&self, _session: SessionId, _client: &str, _frame: &Arc<Frame>) {}
}

impl ChatSink for Discard {
	fn chat_line(&self, _client: &str, _line: &str) {}
}

impl HistorySink for Discard {
	fn append(&self, _line: &str) {}
}

impl ArchiveSink for Discard {
	fn store(&self, _snapshot: &Snapshot) {}
}

impl SessionRegistry for Discard {
	fn remove(&self, _session: SessionId) {}
}

/// Logs reported errors at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrors;

impl ErrorSink for LogErrors {
	fn report(&self, client: &str, error: &Error) {
		warn!(target = "pmon.session", client, error = %error, "session error");
	}
}

/// Collaborators handed to a session at construction.
#[derive(Clone)]
pub struct Sinks {
	pub display: Arc<dyn DisplaySink>,
	pub chat: Arc<dyn ChatSink>,
	pub history: Arc<dyn HistorySink>,
	pub archive: Arc<dyn ArchiveSink>,
	pub errors: Arc<dyn ErrorSink>,
	pub registry: Arc<dyn SessionRegistry>,
}

impl Default for Sinks {
	fn default() -> Self {
		Self {
			display: Arc::new(Discard),
			chat: Arc::new(Discard),
			history: Arc::new(Discard),
			archive: Arc::new(Discard),
			errors: Arc::new(LogErrors),
			registry: Arc::new(Discard),
		}
	}
}

impl Sinks {
	pub fn with_display(mut self, display: Arc<dyn DisplaySink>) -> Self {
		self.display = display;
		self
	}

	pub fn with_chat(mut self, chat: Arc<dyn ChatSink>) -> Self {
		self.chat = chat;
		self
	}

	pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
		self.history = history;
		self
	}

	pub fn with_archive(mut self, archive: Arc<dyn ArchiveSink>) -> Self {
		self.archive = archive;
		self
	}

	pub fn with_errors(mut self, errors: Arc<dyn ErrorSink>) -> Self {
		self.errors = errors;
		self
	}

	pub fn with_registry(mut self, registry: Arc<dyn SessionRegistry>) -> Self {
		self.registry = registry;
		self
	}
}

impl std::fmt::Debug for Sinks {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Sinks").finish_non_exhaustive()
	}
}
