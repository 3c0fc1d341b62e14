//! Wire codec for the parent-monitor protocol.
//!
//! A monitored client talks to the parent over two independent connections:
//!
//! * the image channel, a push-only stream of length-prefixed encoded frames
//!   ([`frame`]);
//! * the text channel, newline-delimited UTF-8 carrying the initial
//!   handshake ([`handshake`]), chat lines, and reserved control tokens
//!   ([`token`]).
//!
//! Types in this crate are pure data plus codec functions over
//! [`std::io::Read`] / [`std::io::Write`]. Threads, sockets and session
//! lifecycle live in `pmon-runtime`.

pub mod frame;
pub mod handshake;
pub mod token;

pub use frame::{DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_LEN, read_frame, write_frame};
pub use handshake::{Environment, HandshakeError, UNKNOWN_CLIENT, USERNAME_KEY};
pub use token::ControlToken;
