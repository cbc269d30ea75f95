use std::sync::Arc;

use crate::context::ContextHandle;
use crate::registry::Registry;

/// Window operations for the context registered on the creating thread.
#[derive(Debug)]
pub struct Window {
    context: Option<Arc<ContextHandle>>,
}

impl Window {
    pub fn for_context(context: Arc<ContextHandle>) -> Self {
        Self {
            context: Some(context),
        }
    }

    pub fn context(&self) -> Option<&Arc<ContextHandle>> {
        self.context.as_ref()
    }

    pub fn show(&self) {
        if let Some(ctx) = self.bound("show") {
            ctx.platform().show_window(ctx.native_handle());
        }
    }

    pub fn swap_buffers(&self) {
        if let Some(ctx) = self.bound("swap_buffers") {
            ctx.platform().swap_buffers(ctx.native_handle());
        }
    }

    /// `true` once the native close flag is raised, or when there is no
    /// context to render into.
    pub fn should_close(&self) -> bool {
        self.context.as_ref().is_none_or(|ctx| ctx.should_close())
    }

    fn bound(&self, op: &str) -> Option<&Arc<ContextHandle>> {
        if self.context.is_none() {
            log::warn!("window {op} without a registered context");
        }
        self.context.as_ref()
    }
}

impl Default for Window {
    /// Attaches to the context registered for the calling thread in the
    /// global registry, without taking a registry reference.
    fn default() -> Self {
        Self {
            context: Registry::global().get::<ContextHandle>(),
        }
    }
}
