//! Logging setup.
//!
//! The runtime only emits through the `log` facade. Hosts that already install a logger
//! keep theirs; hosts that do not (C callers, the demo) call [`init_logging`] once.

mod init;

pub use init::{init_logging, LoggingConfig};
