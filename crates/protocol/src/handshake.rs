//! Handshake payload sent by a client as its first text-channel line.
//!
//! The payload is a `|`-separated list of `key->value` segments describing
//! the client machine, e.g. `USERNAME->alice|OS->linux`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator between handshake segments.
pub const SEGMENT_SEPARATOR: char = '|';

/// Separator between key and value inside a segment.
pub const PAIR_SEPARATOR: &str = "->";

/// Environment key naming the client.
pub const USERNAME_KEY: &str = "USERNAME";

/// Client name used when the handshake carries no [`USERNAME_KEY`].
pub const UNKNOWN_CLIENT: &str = "Unknown";

/// Reasons a handshake payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
	#[error("handshake payload is empty")]
	Empty,

	#[error("handshake segment {index} ({segment:?}) has no `->` separator")]
	MissingSeparator { index: usize, segment: String },

	#[error("handshake segment {index} has an empty key")]
	EmptyKey { index: usize },
}

/// Ordered key/value description of a client, populated once from the
/// handshake and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
	entries: Vec<(String, String)>,
}

impl Environment {
	/// Parses a handshake payload.
	///
	/// Each segment is split at its first `->`, so values may contain the
	/// separator. Trailing `|` separators are ignored. A repeated key keeps
	/// its original position and takes the later value.
	pub fn parse(payload: &str) -> Result<Self, HandshakeError> {
		let payload = payload.trim_end_matches(SEGMENT_SEPARATOR);
		if payload.is_empty() {
			return Err(HandshakeError::Empty);
		}

		let mut env = Self::default();
		for (index, segment) in payload.split(SEGMENT_SEPARATOR).enumerate() {
			let Some((key, value)) = segment.split_once(PAIR_SEPARATOR) else {
				return Err(HandshakeError::MissingSeparator {
					index,
					segment: segment.to_string(),
				});
			};
			if key.is_empty() {
				return Err(HandshakeError::EmptyKey { index });
			}
			env.insert(key, value);
		}
		Ok(env)
	}

	/// Builds an environment from pairs, in order.
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut env = Self::default();
		for (key, value) in pairs {
			env.insert(key, value);
		}
		env
	}

	fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		let key = key.into();
		let value = value.into();
		match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
			Some(entry) => entry.1 = value,
			None => self.entries.push((key, value)),
		}
	}

	/// Looks up a value by key.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	/// Iterates entries in handshake order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Display name of the client: the `USERNAME` entry or [`UNKNOWN_CLIENT`].
	pub fn client_name(&self) -> &str {
		self.get(USERNAME_KEY).unwrap_or(UNKNOWN_CLIENT)
	}

	/// Human-readable rendering used by the info display.
	pub fn summary(&self) -> String {
		let mut out = String::from("Client System Information:");
		for (key, value) in self.iter() {
			out.push('\n');
			out.push_str(key);
			out.push_str(" -> ");
			out.push_str(value);
		}
		out
	}

	/// Encodes the environment back into handshake form.
	pub fn to_payload(&self) -> String {
		let mut out = String::new();
		for (index, (key, value)) in self.iter().enumerate() {
			if index > 0 {
				out.push(SEGMENT_SEPARATOR);
			}
			out.push_str(key);
			out.push_str(PAIR_SEPARATOR);
			out.push_str(value);
		}
		out
	}
}

impl FromStr for Environment {
	type Err = HandshakeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.summary())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_pairs_in_order() {
		let env = Environment::parse("USERNAME->alice|OS->linux").unwrap();
		assert_eq!(env.len(), 2);
		assert_eq!(env.get("USERNAME"), Some("alice"));
		assert_eq!(env.get("OS"), Some("linux"));
		assert_eq!(env.iter().collect::<Vec<_>>(), vec![("USERNAME", "alice"), ("OS", "linux")]);
		assert_eq!(env.client_name(), "alice");
	}

	#[test]
	fn segment_without_separator_is_rejected() {
		let err = Environment::parse("USERNAME->alice|garbage").unwrap_err();
		assert_eq!(
			err,
			HandshakeError::MissingSeparator {
				index: 1,
				segment: "garbage".to_string()
			}
		);
	}

	#[test]
	fn empty_payload_and_empty_key_are_rejected() {
		assert_eq!(Environment::parse(""), Err(HandshakeError::Empty));
		assert_eq!(Environment::parse("->value"), Err(HandshakeError::EmptyKey { index: 0 }));
		assert_eq!(Environment::parse("|"), Err(HandshakeError::Empty));
		assert!(matches!(Environment::parse("A->1||B->2"), Err(HandshakeError::MissingSeparator { index: 1, .. })));
	}

	#[test]
	fn trailing_separators_are_ignored() {
		let env = Environment::parse("USERNAME->dana|OS->linux|").unwrap();
		assert_eq!(env.iter().collect::<Vec<_>>(), vec![("USERNAME", "dana"), ("OS", "linux")]);
		assert_eq!(Environment::parse("A->1||").unwrap().len(), 1);
	}

	#[test]
	fn value_may_contain_separator() {
		let env = Environment::parse("PATH->a->b|EMPTY->").unwrap();
		assert_eq!(env.get("PATH"), Some("a->b"));
		assert_eq!(env.get("EMPTY"), Some(""));
	}

	#[test]
	fn repeated_key_keeps_position_and_last_value() {
		let env = Environment::parse("A->1|B->2|A->3").unwrap();
		assert_eq!(env.iter().collect::<Vec<_>>(), vec![("A", "3"), ("B", "2")]);
	}

	#[test]
	fn missing_username_uses_placeholder() {
		let env: Environment = "OS->windows".parse().unwrap();
		assert_eq!(env.client_name(), UNKNOWN_CLIENT);
	}

	#[test]
	fn summary_lists_entries_under_header() {
		let env = Environment::from_pairs([("USERNAME", "bob"), ("OS", "linux")]);
		assert_eq!(env.summary(), "Client System Information:\nUSERNAME -> bob\nOS -> linux");
	}

	#[test]
	fn payload_encoding_parses_back() {
		let env = Environment::from_pairs([("USERNAME", "carol"), ("HOST", "lab-3")]);
		assert_eq!(env.to_payload(), "USERNAME->carol|HOST->lab-3");
		assert_eq!(Environment::parse(&env.to_payload()).unwrap(), env);
	}
}
