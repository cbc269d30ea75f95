//! Native windowing/graphics capability set.
//!
//! The coordination layer never talks to a windowing library directly. It
//! consumes the [`Platform`] trait, which mirrors the handful of native calls
//! it needs: library init/terminate, window+context creation, binding,
//! event waits and buffer swaps.
//!
//! Affinity rules are the implementor's native rules, surfaced here as
//! documentation: `destroy_window` and `wait_events_timeout` must only be
//! called on the affinity thread. The core guarantees that it does so.

mod headless;
mod types;

use std::time::Duration;

use anyhow::Result;

pub use headless::{HeadlessConfig, HeadlessPlatform, HeadlessStats};
pub use types::{ContextVersion, NativeHandle, WindowHints};

/// Native windowing library as seen by the coordination layer.
pub trait Platform: Send + Sync + 'static {
    /// Initializes the native library. Called once, on the affinity thread.
    fn init(&self) -> Result<()>;

    /// Releases the native library. Called once, after the last context.
    fn terminate(&self);

    /// Creates a window together with its graphics context.
    fn create_window(&self, hints: &WindowHints) -> Result<NativeHandle>;

    /// Destroys a window and its context. Affinity thread only.
    fn destroy_window(&self, handle: NativeHandle);

    /// Binds `handle` to the calling thread, or unbinds with `None`.
    fn make_current(&self, handle: Option<NativeHandle>);

    /// Loads graphics entry points for the context current on this thread.
    fn load_functions(&self) -> Result<()>;

    /// Processes pending events, blocking up to `timeout`. Affinity thread only.
    fn wait_events_timeout(&self, timeout: Duration);

    /// Wakes a pending [`wait_events_timeout`](Platform::wait_events_timeout)
    /// early. Callable from any thread.
    fn post_empty_event(&self);

    fn window_should_close(&self, handle: NativeHandle) -> bool;

    fn set_window_should_close(&self, handle: NativeHandle, value: bool);

    fn show_window(&self, handle: NativeHandle);

    fn swap_buffers(&self, handle: NativeHandle);

    /// Pops the graphics error flag of the context current on this thread.
    ///
    /// Returns `None` when no error is set.
    fn take_error(&self) -> Option<u32>;
}
