//! Graphics context handles.
//!
//! A [`ContextHandle`] owns one native window/context pair. It may be created
//! and dropped on any thread; the native destroy call is always deferred to
//! the affinity thread through the coordinator's queue.

mod binding;
mod handle;

pub use handle::ContextHandle;

use crate::platform::{ContextVersion, WindowHints};

/// Parameters for a new context.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub version: ContextVersion,
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Whether the window is shown on creation. Workers reveal it themselves
    /// after running `start`.
    pub visible: bool,
}

impl ContextConfig {
    pub fn with_version(version: ContextVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn hints(&self) -> WindowHints {
        WindowHints {
            version: self.version,
            width: self.width,
            height: self.height,
            title: self.title.clone(),
            visible: self.visible,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        let hints = WindowHints::default();
        Self {
            version: hints.version,
            width: hints.width,
            height: hints.height,
            title: hints.title,
            visible: hints.visible,
        }
    }
}
