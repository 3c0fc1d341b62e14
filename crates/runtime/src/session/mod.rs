//! One monitored client: handshake, worker threads, operator controls and
//! termination.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use pmon_protocol::{ControlToken, Environment};
use tracing::{debug, info, warn};

use crate::channel::{ImageChannel, TextChannel};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::frame::{Frame, Snapshot};
use crate::sink::{DisplaySink, ErrorSink, Sinks};
use crate::slot::FrameSlot;
use crate::state::{Lifecycle, SessionState};
use crate::worker;

mod control;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
	fn next() -> Self {
		Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationCause {
	/// The client announced it was exiting.
	RemoteExit,
	/// A channel failed underneath the session.
	Disconnected,
	/// The operator closed the session.
	OperatorClose,
	/// The operator closed the session and told the client to shut down.
	Punished,
	/// Too many consecutive frames failed to decode.
	DecodeFailures,
}

impl TerminationCause {
	/// Token sent to the client before the channels are closed, if any.
	pub fn notice(self) -> Option<ControlToken> {
		match self {
			TerminationCause::OperatorClose => Some(ControlToken::CloseClient),
			TerminationCause::Punished => Some(ControlToken::Punish),
			TerminationCause::RemoteExit | TerminationCause::Disconnected | TerminationCause::DecodeFailures => None,
		}
	}

	/// Line appended to the operator history.
	pub fn history_line(self, client: &str, at: DateTime<Local>) -> String {
		let at = at.format("%Y-%m-%d %H:%M:%S");
		match self {
			TerminationCause::OperatorClose => format!("{client} disconnected by server: {at}"),
			TerminationCause::Punished => format!("{client} shutdown by server: {at}"),
			TerminationCause::RemoteExit | TerminationCause::Disconnected => {
				format!("{client} disconnected from server: {at}")
			}
			TerminationCause::DecodeFailures => format!("{client} dropped after repeated bad frames: {at}"),
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			TerminationCause::RemoteExit => "remote exit",
			TerminationCause::Disconnected => "disconnected",
			TerminationCause::OperatorClose => "operator close",
			TerminationCause::Punished => "punished",
			TerminationCause::DecodeFailures => "decode failures",
		}
	}
}

impl fmt::Display for TerminationCause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Everything released by termination. Taken exactly once.
struct Resources {
	image: Arc<ImageChannel>,
	text: Arc<TextChannel>,
	environment: Environment,
	sinks: Sinks,
}

/// A live (or finished) monitoring session for one client.
pub struct Session {
	id: SessionId,
	name: String,
	config: SessionConfig,
	lifecycle: Lifecycle,
	slot: FrameSlot,
	resources: Mutex<Option<Resources>>,
	cause: Mutex<Option<TerminationCause>>,
	snapshot_taken: AtomicBool,
	workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
	/// Connects both channels to `host` and establishes the session.
	///
	/// If the text channel cannot be opened the already-open image channel
	/// is closed before the error is returned.
	pub fn connect(host: &str, image_port: u16, text_port: u16, config: SessionConfig, sinks: Sinks) -> Result<Arc<Self>> {
		let image = ImageChannel::connect(host, image_port, config.connect_timeout)?.with_max_frame_len(config.max_frame_len);
		let text = match TextChannel::connect(host, text_port, config.connect_timeout) {
			Ok(text) => text,
			Err(err) => {
				image.close();
				return Err(err);
			}
		};
		Self::establish(image, text, config, sinks)
	}

	/// Reads the handshake from `text`, then starts the control loop and both
	/// workers.
	///
	/// On any handshake failure both channels are closed and no session is
	/// created.
	pub fn establish(image: ImageChannel, text: TextChannel, config: SessionConfig, sinks: Sinks) -> Result<Arc<Self>> {
		let environment = match read_handshake(&text) {
			Ok(environment) => environment,
			Err(err) => {
				warn!(target = "pmon.session", peer = %text, error = %err, "handshake failed");
				text.close();
				image.close();
				return Err(err);
			}
		};

		let name = environment.client_name().to_string();
		let image = Arc::new(image);
		let text = Arc::new(text);
		let session = Arc::new(Self {
			id: SessionId::next(),
			name,
			config,
			lifecycle: Lifecycle::new(),
			slot: FrameSlot::default(),
			resources: Mutex::new(Some(Resources {
				image: Arc::clone(&image),
				text: Arc::clone(&text),
				environment,
				sinks,
			})),
			cause: Mutex::new(None),
			snapshot_taken: AtomicBool::new(false),
			workers: Mutex::new(Vec::with_capacity(3)),
		});

		if let Err(err) = session.spawn_workers(image, text) {
			session.terminate(TerminationCause::Disconnected);
			return Err(err.into());
		}

		session.lifecycle.activate();
		info!(target = "pmon.session", id = %session.id, client = %session.name, "session established");
		Ok(session)
	}

	fn spawn_workers(self: &Arc<Self>, image: Arc<ImageChannel>, text: Arc<TextChannel>) -> std::io::Result<()> {
		let mut workers = self.workers.lock();

		let session = Arc::clone(self);
		workers.push(
			thread::Builder::new()
				.name(format!("{} control", self.name))
				.spawn(move || control::run(session, text))?,
		);

		let session = Arc::clone(self);
		workers.push(
			thread::Builder::new()
				.name(format!("{} frame retriever", self.name))
				.spawn(move || worker::retriever::run(session, image))?,
		);

		let session = Arc::clone(self);
		workers.push(
			thread::Builder::new()
				.name(format!("{} render ticker", self.name))
				.spawn(move || worker::ticker::run(session))?,
		);

		Ok(())
	}

	pub fn id(&self) -> SessionId {
		self.id
	}

	/// `USERNAME` from the handshake, or `"Unknown"`.
	pub fn client_name(&self) -> &str {
		&self.name
	}

	pub fn state(&self) -> SessionState {
		self.lifecycle.state()
	}

	pub fn is_terminated(&self) -> bool {
		self.lifecycle.is_terminated()
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Newest decoded frame, if one has arrived and the session is live.
	pub fn current_frame(&self) -> Option<Arc<Frame>> {
		self.slot.latest()
	}

	/// Frames successfully decoded over the session's lifetime.
	pub fn frames_received(&self) -> u64 {
		self.slot.received()
	}

	/// Set once termination has started.
	pub fn termination_cause(&self) -> Option<TerminationCause> {
		*self.cause.lock()
	}

	/// Whether a snapshot was ever taken during this session.
	pub fn has_snapshots(&self) -> bool {
		self.snapshot_taken.load(Ordering::Relaxed)
	}

	/// Pauses or resumes both workers. Returns whether the state changed.
	pub fn set_paused(&self, paused: bool) -> bool {
		let changed = self.lifecycle.set_paused(paused);
		if changed {
			debug!(target = "pmon.session", id = %self.id, client = %self.name, paused, "pause toggled");
		}
		changed
	}

	/// Tells the client to close, then terminates. Returns `true` if this
	/// call performed the termination.
	pub fn request_close(&self) -> bool {
		self.terminate(TerminationCause::OperatorClose)
	}

	/// Tells the client to shut down, then terminates. Returns `true` if this
	/// call performed the termination.
	pub fn punish(&self) -> bool {
		self.terminate(TerminationCause::Punished)
	}

	/// Archives the current frame. `None` before the first frame or once
	/// terminated.
	pub fn snapshot(&self) -> Option<Snapshot> {
		let (archive, history) = {
			let resources = self.resources.lock();
			let sinks = &resources.as_ref()?.sinks;
			(Arc::clone(&sinks.archive), Arc::clone(&sinks.history))
		};
		let frame = self.slot.latest()?;

		let snapshot = Snapshot::new(self.name.clone(), frame, Local::now());
		archive.store(&snapshot);
		history.append(&format!("{} saved", snapshot.title));
		self.snapshot_taken.store(true, Ordering::Relaxed);
		debug!(target = "pmon.session", id = %self.id, title = %snapshot.title, "snapshot taken");
		Some(snapshot)
	}

	/// Environment rendered for display, or `None` once terminated.
	pub fn environment_summary(&self) -> Option<String> {
		self.resources.lock().as_ref().map(|resources| resources.environment.summary())
	}

	/// Value of one handshake entry, or `None` once terminated.
	pub fn environment_value(&self, key: &str) -> Option<String> {
		self.resources.lock().as_ref()?.environment.get(key).map(str::to_string)
	}

	/// Sends an operator chat line to the client.
	///
	/// Text equal to a reserved control token is refused. A failed write
	/// ends the session.
	pub fn send_chat(&self, text: &str) -> Result<()> {
		if ControlToken::is_reserved(text) {
			return Err(Error::ReservedToken(text.to_string()));
		}
		let channel = self.text_channel().ok_or(Error::Terminated)?;

		match channel.send_line(text) {
			Ok(()) => Ok(()),
			Err(Error::Io(err)) if err.kind() != std::io::ErrorKind::InvalidInput => {
				let err = Error::Io(err);
				if !self.is_winding_down() {
					self.report(&err);
					self.terminate(TerminationCause::Disconnected);
				}
				Err(err)
			}
			Err(err) => Err(err),
		}
	}

	/// Waits for the control loop and both workers to exit.
	///
	/// Handles belonging to the calling thread are detached instead.
	pub fn join_workers(&self) {
		let workers = std::mem::take(&mut *self.workers.lock());
		let current = thread::current().id();
		for handle in workers {
			if handle.thread().id() == current {
				continue;
			}
			if handle.join().is_err() {
				warn!(target = "pmon.session", id = %self.id, client = %self.name, "worker thread panicked");
			}
		}
	}

	/// Runs the termination sequence if no one has yet.
	///
	/// The resources lock is held for the whole sequence, so a losing caller
	/// returns only after the winner has finished.
	pub(crate) fn terminate(&self, cause: TerminationCause) -> bool {
		let mut guard = self.resources.lock();
		let Some(resources) = guard.take() else {
			return false;
		};
		*self.cause.lock() = Some(cause);

		resources.sinks.registry.remove(self.id);

		if let Some(token) = cause.notice() {
			if let Err(err) = resources.text.send_line(token.as_str()) {
				warn!(target = "pmon.session", id = %self.id, client = %self.name, %token, error = %err, "failed to send close notice");
			}
		}

		resources.sinks.history.append(&cause.history_line(&self.name, Local::now()));

		resources.text.close();
		resources.image.close();
		self.lifecycle.terminate();
		self.slot.seal();
		drop(resources);
		drop(guard);

		info!(target = "pmon.session", id = %self.id, client = %self.name, %cause, "session terminated");
		true
	}

	/// True once termination has started, even if it has not finished.
	pub(crate) fn is_winding_down(&self) -> bool {
		self.cause.lock().is_some() || self.lifecycle.is_terminated()
	}

	pub(crate) fn lifecycle(&self) -> &Lifecycle {
		&self.lifecycle
	}

	pub(crate) fn store_frame(&self, frame: Frame) -> bool {
		self.slot.store(frame)
	}

	pub(crate) fn display_sink(&self) -> Option<Arc<dyn DisplaySink>> {
		self.resources.lock().as_ref().map(|resources| Arc::clone(&resources.sinks.display))
	}

	pub(crate) fn forward_chat(&self, line: &str) {
		let chat = self.resources.lock().as_ref().map(|resources| Arc::clone(&resources.sinks.chat));
		if let Some(chat) = chat {
			chat.chat_line(&self.name, line);
		}
	}

	/// Hands an in-session failure to the error sink, unless termination
	/// already released it.
	pub(crate) fn report(&self, err: &Error) {
		let errors: Option<Arc<dyn ErrorSink>> = self.resources.lock().as_ref().map(|resources| Arc::clone(&resources.sinks.errors));
		match errors {
			Some(errors) => errors.report(&self.name, err),
			None => debug!(target = "pmon.session", id = %self.id, client = %self.name, error = %err, "error after termination"),
		}
	}

	fn text_channel(&self) -> Option<Arc<TextChannel>> {
		self.resources.lock().as_ref().map(|resources| Arc::clone(&resources.text))
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("state", &self.state())
			.finish_non_exhaustive()
	}
}

fn read_handshake(text: &TextChannel) -> Result<Environment> {
	let line = text.read_line().map_err(|err| match err {
		Error::Io(err) => Error::HandshakeIo(err),
		other => other,
	})?;
	Ok(Environment::parse(&line)?)
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;

	use super::*;

	#[test]
	fn only_operator_causes_carry_a_notice() {
		assert_eq!(TerminationCause::OperatorClose.notice(), Some(ControlToken::CloseClient));
		assert_eq!(TerminationCause::Punished.notice(), Some(ControlToken::Punish));
		assert_eq!(TerminationCause::RemoteExit.notice(), None);
		assert_eq!(TerminationCause::Disconnected.notice(), None);
		assert_eq!(TerminationCause::DecodeFailures.notice(), None);
	}

	#[test]
	fn history_lines_name_the_client_and_time() {
		let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
		assert_eq!(
			TerminationCause::OperatorClose.history_line("alice", at),
			"alice disconnected by server: 2024-03-09 14:05:07"
		);
		assert_eq!(TerminationCause::Punished.history_line("alice", at), "alice shutdown by server: 2024-03-09 14:05:07");
		assert_eq!(
			TerminationCause::RemoteExit.history_line("bob", at),
			TerminationCause::Disconnected.history_line("bob", at)
		);
		assert!(TerminationCause::DecodeFailures.history_line("bob", at).starts_with("bob dropped after repeated bad frames"));
	}

	#[test]
	fn session_ids_are_unique_and_display_with_hash() {
		let a = SessionId::next();
		let b = SessionId::next();
		assert_ne!(a, b);
		assert!(b > a);
		assert_eq!(a.to_string(), format!("#{}", a.get()));
	}
}
