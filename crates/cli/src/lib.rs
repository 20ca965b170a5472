//! partio command-line internals
//!
//! The `partio` binary parses arguments and dispatches here; integration
//! tests drive the binary itself.

pub mod cmd;
pub mod config;
pub mod hooks;
pub mod logging;
pub mod util;
