//! `pmon watch`: connect to clients and run the operator console.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use pmon_runtime::{Session, Sinks};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::WatchArgs;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::operator::{HELP, OperatorCommand};
use crate::registry::SessionTable;
use crate::sinks::{ConsoleChat, HeadlessDisplay, HistoryLog, SnapshotArchive};

const IDLE_CHECK: Duration = Duration::from_millis(500);

/// Whether the console keeps reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	Continue,
	Quit,
}

/// Applies operator commands to the session table.
pub struct Console {
	table: Arc<SessionTable>,
	display: Arc<HeadlessDisplay>,
}

impl Console {
	pub fn new(table: Arc<SessionTable>, display: Arc<HeadlessDisplay>) -> Self {
		Self { table, display }
	}

	/// Runs one command, writing operator-facing output to `out`.
	///
	/// Blocks while a close notice or snapshot is written; call it off the
	/// async runtime.
	pub fn handle(&self, command: OperatorCommand, out: &mut impl Write) -> io::Result<Flow> {
		let target = match &command {
			OperatorCommand::List => return self.list(out).map(|()| Flow::Continue),
			OperatorCommand::Help => return writeln!(out, "{HELP}").map(|()| Flow::Continue),
			OperatorCommand::Quit => return Ok(Flow::Quit),
			OperatorCommand::Select(n)
			| OperatorCommand::Pause(n)
			| OperatorCommand::Resume(n)
			| OperatorCommand::Snap(n)
			| OperatorCommand::Info(n)
			| OperatorCommand::Say(n, _)
			| OperatorCommand::Close(n)
			| OperatorCommand::Punish(n) => *n,
		};

		let Some(session) = self.table.get(target) else {
			writeln!(out, "no session {target}; see /list")?;
			return Ok(Flow::Continue);
		};
		let name = session.client_name();

		match command {
			OperatorCommand::Select(n) => {
				self.table.select(n);
				writeln!(out, "watching {name}")?;
			}
			OperatorCommand::Pause(_) => {
				if session.set_paused(true) {
					writeln!(out, "{name} paused")?;
				} else {
					writeln!(out, "{name} is not running")?;
				}
			}
			OperatorCommand::Resume(_) => {
				if session.set_paused(false) {
					writeln!(out, "{name} resumed")?;
				} else {
					writeln!(out, "{name} is not paused")?;
				}
			}
			OperatorCommand::Snap(_) => match session.snapshot() {
				Some(snapshot) => writeln!(out, "captured {}", snapshot.title)?,
				None => writeln!(out, "{name} has not sent a frame yet")?,
			},
			OperatorCommand::Info(_) => {
				if let Some(summary) = session.environment_summary() {
					writeln!(out, "{summary}")?;
				}
				let size = match self.display.last_size(session.id()) {
					Some((width, height)) => format!("{width}x{height}"),
					None => "none".to_string(),
				};
				writeln!(
					out,
					"state: {}, frames: {}, last frame: {size}, snapshots taken: {}",
					session.state(),
					session.frames_received(),
					if session.has_snapshots() { "yes" } else { "no" },
				)?;
			}
			OperatorCommand::Say(_, text) => {
				if let Err(err) = session.send_chat(&text) {
					writeln!(out, "could not send to {name}: {err}")?;
				}
			}
			OperatorCommand::Close(_) => {
				session.request_close();
				self.display.forget(session.id());
			}
			OperatorCommand::Punish(_) => {
				session.punish();
				self.display.forget(session.id());
			}
			OperatorCommand::List | OperatorCommand::Help | OperatorCommand::Quit => {}
		}
		Ok(Flow::Continue)
	}

	fn list(&self, out: &mut impl Write) -> io::Result<()> {
		let sessions = self.table.list();
		if sessions.is_empty() {
			return writeln!(out, "no sessions");
		}
		for (index, session) in sessions.iter().enumerate() {
			writeln!(
				out,
				"{}. {} [{}] frames={} redraws={}",
				index + 1,
				session.client_name(),
				session.state(),
				session.frames_received(),
				self.display.redraws(session.id()),
			)?;
		}
		Ok(())
	}
}

pub async fn execute(args: WatchArgs, mut config: MonitorConfig) -> Result<()> {
	config.apply_watch_args(&args)?;

	let table = Arc::new(SessionTable::new());
	let display = Arc::new(HeadlessDisplay::new());
	let sinks = Sinks::default()
		.with_display(display.clone())
		.with_chat(Arc::new(ConsoleChat))
		.with_history(Arc::new(HistoryLog::new(config.history_file.as_deref())?))
		.with_archive(Arc::new(SnapshotArchive::new(config.snapshot_dir())))
		.with_registry(table.clone());

	let sessions = connect_all(&args.hosts, &config, &sinks, &table).await?;
	if sessions.is_empty() {
		return Err(anyhow!("none of {} host(s) could be watched", args.hosts.len()).into());
	}
	println!("watching {} client(s); type /help for commands", sessions.len());

	let console = Arc::new(Console::new(table.clone(), display));
	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	let mut stdin_open = true;
	let mut idle = tokio::time::interval(IDLE_CHECK);

	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {
				info!(target = "pmon", "interrupted");
				break;
			}
			line = lines.next_line(), if stdin_open => match line? {
				Some(line) if line.trim().is_empty() => {}
				Some(line) => match OperatorCommand::parse(&line) {
					Ok(command) => {
						debug!(target = "pmon", %command, "operator command");
						let console = Arc::clone(&console);
						let flow = tokio::task::spawn_blocking(move || console.handle(command, &mut io::stdout().lock()))
							.await
							.map_err(anyhow::Error::from)??;
						if flow == Flow::Quit {
							break;
						}
					}
					Err(err) => eprintln!("{err}"),
				},
				None => {
					debug!(target = "pmon", "stdin closed; watching until interrupted");
					stdin_open = false;
				}
			},
			_ = idle.tick() => {
				if table.is_empty() {
					println!("all clients disconnected");
					break;
				}
			}
		}
	}

	tokio::task::spawn_blocking(move || {
		let closed = table.close_all();
		debug!(target = "pmon", closed, "closed remaining sessions");
		for session in sessions {
			session.join_workers();
		}
	})
	.await
	.map_err(anyhow::Error::from)?;
	Ok(())
}

/// Connects to every host in parallel. Hosts that fail are logged and
/// skipped.
async fn connect_all(hosts: &[String], config: &MonitorConfig, sinks: &Sinks, table: &SessionTable) -> Result<Vec<Arc<Session>>> {
	let pending: Vec<_> = hosts
		.iter()
		.map(|host| {
			let target = host.clone();
			let (image_port, text_port) = (config.image_port, config.text_port);
			let session_config = config.session_config();
			let sinks = sinks.clone();
			let task = tokio::task::spawn_blocking(move || Session::connect(&target, image_port, text_port, session_config, sinks));
			(host, task)
		})
		.collect();

	let mut sessions = Vec::with_capacity(pending.len());
	for (host, task) in pending {
		match task.await.map_err(anyhow::Error::from)? {
			Ok(session) => {
				println!("connected to {host} ({})", session.client_name());
				if table.insert(Arc::clone(&session)) {
					sessions.push(session);
				}
			}
			Err(err) => warn!(target = "pmon", host = %host, error = %err, "could not watch host"),
		}
	}
	Ok(sessions)
}
