//! Thread-local window utility.
//!
//! A worker creates one [`Window`] through the registry after binding its
//! context. The window operates on that context: it reveals it once the
//! application has started and presents each frame.

mod utility;

pub use utility::Window;
