//! Tether engine crate.
//!
//! Coordinates graphics contexts whose native teardown and event polling are
//! bound to one affinity thread, while each context renders on its own worker
//! thread.

pub mod boot;
pub mod context;
pub mod coordinator;
pub mod platform;
pub mod queue;
pub mod registry;
pub mod window;

pub mod logging;
pub mod time;

mod error;

pub use error::{Error, ErrorKind, Result};
