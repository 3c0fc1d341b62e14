//! Operator commands typed on stdin while watching.

use std::fmt;

use thiserror::Error;

/// One parsed console command. Session numbers are the 1-based indices
/// printed by `/list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
	List,
	Select(usize),
	Pause(usize),
	Resume(usize),
	Snap(usize),
	Info(usize),
	Say(usize, String),
	Close(usize),
	Punish(usize),
	Help,
	Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("commands start with '/'; type /help")]
	NotACommand,
	#[error("unknown command /{0}; type /help")]
	Unknown(String),
	#[error("/{0} needs a session number")]
	MissingIndex(&'static str),
	#[error("{0:?} is not a session number")]
	BadIndex(String),
	#[error("/say needs a message")]
	MissingText,
}

pub const HELP: &str = "\
/list                 show sessions
/select N             watch session N, pause the rest
/pause N | /resume N  stop or restart frames for session N
/snap N               save session N's current frame
/info N               show session N's system information
/say N <text>         send a chat line to session N
/close N              close session N
/punish N             tell session N's client to shut down
/quit                 close everything and exit";

impl OperatorCommand {
	pub fn parse(line: &str) -> Result<Self, ParseError> {
		let line = line.trim();
		let Some(rest) = line.strip_prefix('/') else {
			return Err(ParseError::NotACommand);
		};
		let (name, args) = match rest.split_once(char::is_whitespace) {
			Some((name, args)) => (name, args.trim_start()),
			None => (rest, ""),
		};

		let command = match name {
			"list" | "ls" => OperatorCommand::List,
			"help" | "?" => OperatorCommand::Help,
			"quit" | "exit" => OperatorCommand::Quit,
			"select" => OperatorCommand::Select(index("select", args)?),
			"pause" => OperatorCommand::Pause(index("pause", args)?),
			"resume" => OperatorCommand::Resume(index("resume", args)?),
			"snap" => OperatorCommand::Snap(index("snap", args)?),
			"info" => OperatorCommand::Info(index("info", args)?),
			"close" => OperatorCommand::Close(index("close", args)?),
			"punish" => OperatorCommand::Punish(index("punish", args)?),
			"say" => {
				let (number, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
				let target = index("say", number)?;
				let text = text.trim();
				if text.is_empty() {
					return Err(ParseError::MissingText);
				}
				OperatorCommand::Say(target, text.to_string())
			}
			other => return Err(ParseError::Unknown(other.to_string())),
		};
		Ok(command)
	}
}

fn index(command: &'static str, args: &str) -> Result<usize, ParseError> {
	let arg = args.split_whitespace().next().ok_or(ParseError::MissingIndex(command))?;
	match arg.parse::<usize>() {
		Ok(n) if n > 0 => Ok(n),
		_ => Err(ParseError::BadIndex(arg.to_string())),
	}
}

impl fmt::Display for OperatorCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OperatorCommand::List => f.write_str("/list"),
			OperatorCommand::Select(n) => write!(f, "/select {n}"),
			OperatorCommand::Pause(n) => write!(f, "/pause {n}"),
			OperatorCommand::Resume(n) => write!(f, "/resume {n}"),
			OperatorCommand::Snap(n) => write!(f, "/snap {n}"),
			OperatorCommand::Info(n) => write!(f, "/info {n}"),
			OperatorCommand::Say(n, text) => write!(f, "/say {n} {text}"),
			OperatorCommand::Close(n) => write!(f, "/close {n}"),
			OperatorCommand::Punish(n) => write!(f, "/punish {n}"),
			OperatorCommand::Help => f.write_str("/help"),
			OperatorCommand::Quit => f.write_str("/quit"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_indexed_commands() {
		assert_eq!(OperatorCommand::parse("/select 2"), Ok(OperatorCommand::Select(2)));
		assert_eq!(OperatorCommand::parse("  /punish   1  "), Ok(OperatorCommand::Punish(1)));
		assert_eq!(OperatorCommand::parse("/list"), Ok(OperatorCommand::List));
		assert_eq!(OperatorCommand::parse("/quit"), Ok(OperatorCommand::Quit));
	}

	#[test]
	fn say_keeps_the_rest_of_the_line() {
		assert_eq!(
			OperatorCommand::parse("/say 3 dinner in  five minutes"),
			Ok(OperatorCommand::Say(3, "dinner in  five minutes".to_string()))
		);
		assert_eq!(OperatorCommand::parse("/say 3"), Err(ParseError::MissingText));
		assert_eq!(OperatorCommand::parse("/say"), Err(ParseError::MissingIndex("say")));
	}

	#[test]
	fn rejects_bad_input() {
		assert_eq!(OperatorCommand::parse("hello"), Err(ParseError::NotACommand));
		assert_eq!(OperatorCommand::parse("/nuke 1"), Err(ParseError::Unknown("nuke".to_string())));
		assert_eq!(OperatorCommand::parse("/close"), Err(ParseError::MissingIndex("close")));
		assert_eq!(OperatorCommand::parse("/close 0"), Err(ParseError::BadIndex("0".to_string())));
		assert_eq!(OperatorCommand::parse("/snap two"), Err(ParseError::BadIndex("two".to_string())));
	}

	#[test]
	fn display_parses_back() {
		for command in [OperatorCommand::Info(4), OperatorCommand::Say(1, "hi there".into()), OperatorCommand::Help] {
			assert_eq!(OperatorCommand::parse(&command.to_string()), Ok(command));
		}
	}
}
