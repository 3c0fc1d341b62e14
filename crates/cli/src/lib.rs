//! `pmon`: operator console for parent-monitor.
//!
//! Connects to one or more monitored clients, keeps one runtime session per
//! client, and reads operator commands from stdin.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod operator;
pub mod registry;
pub mod sinks;
