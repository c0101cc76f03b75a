//! Taskfeed command line library.
//!
//! Replays recorded buffer streams and follows live buffer files through a
//! task session. Separated from main.rs so the modes can be tested directly.

pub mod config;
pub mod logging;
pub mod render;
pub mod replay;
pub mod watch;
