//! Shared types for the taskfeed progress log.

mod markup;
mod session;
mod step;

pub use markup::*;
pub use session::*;
pub use step::*;
