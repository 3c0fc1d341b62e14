//! Session runtime for parent-monitor.
//!
//! One [`Session`] exists per connected client. It owns an [`ImageChannel`]
//! carrying pushed screen captures and a [`TextChannel`] carrying the
//! handshake, chat and control tokens, and runs three threads:
//!
//! * a control loop reading the text channel,
//! * a frame retriever filling the single current-frame slot,
//! * a render ticker asking the display sink to redraw at a fixed interval.
//!
//! Everything the session reports outward goes through the trait objects in
//! [`Sinks`]. Termination is a single critical section that can be entered
//! from the operator, the remote, or a failing worker; only the first caller
//! runs it.

pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod session;
pub mod sink;
mod slot;
mod state;
pub mod transport;
mod worker;

pub use channel::{ImageChannel, TextChannel};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use frame::{Frame, Snapshot};
pub use pmon_protocol::{ControlToken, Environment};
pub use session::{Session, SessionId, TerminationCause};
pub use sink::Sinks;
pub use state::SessionState;
