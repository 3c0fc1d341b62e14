//! Per-session worker loops. Each runs on its own named thread and exits on
//! its own once the session terminates.

pub(crate) mod retriever;
pub(crate) mod ticker;
