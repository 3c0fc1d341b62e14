//! Console-side implementations of the runtime's sinks.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;
use parking_lot::Mutex;
use pmon_runtime::frame::{Frame, Snapshot};
use pmon_runtime::sink::{ArchiveSink, ChatSink, DisplaySink, HistorySink};
use pmon_runtime::SessionId;
use tracing::{debug, info, warn};

/// Prints client chat to stdout as `[client] line`.
#[derive(Debug, Default)]
pub struct ConsoleChat;

impl ChatSink for ConsoleChat {
	fn chat_line(&self, client: &str, line: &str) {
		println!("[{client}] {line}");
	}
}

/// Operator history: always logged, optionally appended to a file.
pub struct HistoryLog {
	file: Option<Mutex<File>>,
}

impl HistoryLog {
	pub fn new(path: Option<&Path>) -> io::Result<Self> {
		let file = match path {
			Some(path) => {
				if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
					fs::create_dir_all(parent)?;
				}
				Some(Mutex::new(OpenOptions::new().create(true).append(true).open(path)?))
			}
			None => None,
		};
		Ok(Self { file })
	}
}

impl HistorySink for HistoryLog {
	fn append(&self, line: &str) {
		info!(target = "pmon.history", "{line}");
		println!("* {line}");

		let Some(file) = &self.file else {
			return;
		};
		let mut file = file.lock();
		if let Err(err) = writeln!(file, "{line}").and_then(|()| file.flush()) {
			warn!(target = "pmon.history", error = %err, "failed to append history line");
		}
	}
}

/// Writes snapshots as PNG files under one directory.
pub struct SnapshotArchive {
	dir: PathBuf,
}

impl SnapshotArchive {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// `<dir>/<client>-<unix millis>.png`, with the client name reduced to
	/// characters safe in a file name.
	pub fn path_for(&self, snapshot: &Snapshot) -> PathBuf {
		let client: String = snapshot
			.client
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
			.collect();
		self.dir.join(format!("{client}-{}.png", snapshot.taken_at.timestamp_millis()))
	}

	fn write(&self, snapshot: &Snapshot) -> anyhow::Result<PathBuf> {
		fs::create_dir_all(&self.dir)?;
		let path = self.path_for(snapshot);
		snapshot.frame.image().save_with_format(&path, ImageFormat::Png)?;
		Ok(path)
	}
}

impl ArchiveSink for SnapshotArchive {
	fn store(&self, snapshot: &Snapshot) {
		match self.write(snapshot) {
			Ok(path) => info!(target = "pmon.archive", title = %snapshot.title, path = %path.display(), "snapshot written"),
			Err(err) => warn!(target = "pmon.archive", title = %snapshot.title, error = %err, "failed to write snapshot"),
		}
	}
}

/// Display for a terminal: there is no window, so redraws are counted and
/// the newest frame per session is kept for `/info`.
#[derive(Default)]
pub struct HeadlessDisplay {
	screens: Mutex<HashMap<SessionId, Screen>>,
}

struct Screen {
	frame: Arc<Frame>,
	redraws: u64,
}

impl HeadlessDisplay {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn redraws(&self, session: SessionId) -> u64 {
		self.screens.lock().get(&session).map_or(0, |screen| screen.redraws)
	}

	/// Dimensions of the last frame drawn for `session`.
	pub fn last_size(&self, session: SessionId) -> Option<(u32, u32)> {
		self.screens.lock().get(&session).map(|screen| (screen.frame.width(), screen.frame.height()))
	}

	pub fn forget(&self, session: SessionId) {
		self.screens.lock().remove(&session);
	}
}

impl DisplaySink for HeadlessDisplay {
	fn show_frame(&self, session: SessionId, client: &str, frame: &Arc<Frame>) {
		let mut screens = self.screens.lock();
		match screens.get_mut(&session) {
			Some(screen) => {
				if !Arc::ptr_eq(&screen.frame, frame) {
					debug!(target = "pmon.display", %session, client, width = frame.width(), height = frame.height(), "new frame");
					screen.frame = Arc::clone(frame);
				}
				screen.redraws += 1;
			}
			None => {
				debug!(target = "pmon.display", %session, client, width = frame.width(), height = frame.height(), "first frame");
				screens.insert(
					session,
					Screen {
						frame: Arc::clone(frame),
						redraws: 1,
					},
				);
			}
		}
	}
}
