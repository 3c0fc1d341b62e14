//! Reserved control tokens carried on the text channel.

use std::fmt;

/// A text-channel line with protocol meaning.
///
/// Tokens are exact, case-sensitive matches of a whole line. Anything else
/// on the text channel is chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlToken {
	/// Client to parent: the client is leaving voluntarily.
	ClientExited,
	/// Parent to client: administrative disconnect.
	CloseClient,
	/// Parent to client: punitive disconnect.
	Punish,
}

impl ControlToken {
	/// Every reserved token.
	pub const ALL: [ControlToken; 3] = [ControlToken::ClientExited, ControlToken::CloseClient, ControlToken::Punish];

	/// Wire representation of the token.
	pub const fn as_str(self) -> &'static str {
		match self {
			ControlToken::ClientExited => "CLIENT_EXITED",
			ControlToken::CloseClient => "CLOSE_CLIENT",
			ControlToken::Punish => "PUNISH",
		}
	}

	/// Matches a received line against the reserved set.
	pub fn parse(line: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|token| token.as_str() == line)
	}

	/// Returns `true` when `text` would be read back as a control token.
	pub fn is_reserved(text: &str) -> bool {
		Self::parse(text).is_some()
	}
}

impl fmt::Display for ControlToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
