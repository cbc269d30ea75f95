use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU64;
use std::thread::{self, ThreadId};
use std::time::Duration;

use anyhow::{bail, Result};
use parking_lot::{Condvar, Mutex};

use super::{ContextVersion, NativeHandle, Platform, WindowHints};

/// Behaviour knobs for [`HeadlessPlatform`].
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Highest context version the simulated driver offers.
    pub max_version: ContextVersion,

    /// Makes [`Platform::init`] fail.
    pub fail_init: bool,

    /// Makes [`Platform::load_functions`] fail.
    pub fail_load: bool,

    /// Raises the should-close flag of a window after this many swaps.
    ///
    /// Stands in for a user closing the window.
    pub close_after_swaps: Option<u64>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            max_version: ContextVersion::new(4, 6),
            fail_init: false,
            fail_load: false,
            close_after_swaps: None,
        }
    }
}

/// Snapshot of what the simulated library has seen.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct HeadlessStats {
    pub created: usize,
    pub live_windows: usize,
    pub destroyed: usize,
    /// Affinity-only calls made off the affinity thread, and contexts bound
    /// on two threads at once.
    pub violations: usize,
    pub waits: u64,
    pub wakeups: u64,
    pub swaps: u64,
}

#[derive(Debug)]
struct SimWindow {
    hints: WindowHints,
    visible: bool,
    should_close: bool,
    swaps: u64,
    current_on: Option<ThreadId>,
    errors: VecDeque<u32>,
}

#[derive(Debug, Default)]
struct State {
    initialized: bool,
    terminated: bool,
    affinity: Option<ThreadId>,
    next_handle: u64,
    windows: HashMap<NativeHandle, SimWindow>,
    current: HashMap<ThreadId, NativeHandle>,
    destroyed: Vec<(NativeHandle, ThreadId)>,
    pending_wake: bool,
    stats: HeadlessStats,
}

impl State {
    fn check_affinity(&mut self, call: &str) {
        let here = thread::current().id();
        if self.affinity != Some(here) {
            log::error!("{call} called off the affinity thread ({here:?})");
            self.stats.violations += 1;
        }
    }
}

/// In-process stand-in for a native windowing library.
///
/// Windows are plain records; nothing is drawn. Every call the coordination
/// layer makes is checked against the native threading rules and counted, so
/// tests can assert on affinity and teardown ordering.
#[derive(Debug, Default)]
pub struct HeadlessPlatform {
    config: HeadlessConfig,
    state: Mutex<State>,
    wake: Condvar,
}

impl HeadlessPlatform {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
            wake: Condvar::new(),
        }
    }

    pub fn stats(&self) -> HeadlessStats {
        let state = self.state.lock();
        HeadlessStats {
            live_windows: state.windows.len(),
            ..state.stats
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    pub fn is_visible(&self, handle: NativeHandle) -> bool {
        self.state
            .lock()
            .windows
            .get(&handle)
            .is_some_and(|w| w.visible)
    }

    pub fn hints(&self, handle: NativeHandle) -> Option<WindowHints> {
        self.state.lock().windows.get(&handle).map(|w| w.hints.clone())
    }

    /// Thread that destroyed `handle`, if it has been destroyed.
    pub fn destroyed_on(&self, handle: NativeHandle) -> Option<ThreadId> {
        self.state
            .lock()
            .destroyed
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, t)| *t)
    }

    /// Context bound to `thread`, if any.
    pub fn current_on(&self, thread: ThreadId) -> Option<NativeHandle> {
        self.state.lock().current.get(&thread).copied()
    }

    /// Queues a graphics error code on `handle`'s context.
    pub fn inject_error(&self, handle: NativeHandle, code: u32) {
        if let Some(window) = self.state.lock().windows.get_mut(&handle) {
            window.errors.push_back(code);
        }
    }

    /// Closes every live window, as if the user clicked each close button.
    pub fn close_all(&self) {
        let mut state = self.state.lock();
        for window in state.windows.values_mut() {
            window.should_close = true;
        }
    }
}

impl Platform for HeadlessPlatform {
    fn init(&self) -> Result<()> {
        if self.config.fail_init {
            bail!("no display available");
        }

        let mut state = self.state.lock();
        state.initialized = true;
        state.terminated = false;
        state.affinity = Some(thread::current().id());
        Ok(())
    }

    fn terminate(&self) {
        let mut state = self.state.lock();
        if !state.windows.is_empty() {
            log::warn!("terminating with {} live windows", state.windows.len());
        }
        state.windows.clear();
        state.current.clear();
        state.initialized = false;
        state.terminated = true;
    }

    fn create_window(&self, hints: &WindowHints) -> Result<NativeHandle> {
        let mut state = self.state.lock();
        if !state.initialized {
            bail!("library is not initialized");
        }
        if hints.version > self.config.max_version {
            bail!(
                "context version {} unavailable (driver offers up to {})",
                hints.version,
                self.config.max_version
            );
        }

        state.next_handle += 1;
        let Some(raw) = NonZeroU64::new(state.next_handle) else {
            bail!("handle space exhausted");
        };
        let handle = NativeHandle::new(raw);

        state.windows.insert(
            handle,
            SimWindow {
                hints: hints.clone(),
                visible: hints.visible,
                should_close: false,
                swaps: 0,
                current_on: None,
                errors: VecDeque::new(),
            },
        );
        state.stats.created += 1;
        Ok(handle)
    }

    fn destroy_window(&self, handle: NativeHandle) {
        let mut state = self.state.lock();
        state.check_affinity("destroy_window");

        let Some(window) = state.windows.remove(&handle) else {
            log::warn!("destroy_window on unknown {handle:?}");
            return;
        };
        if let Some(thread) = window.current_on {
            state.current.remove(&thread);
        }
        state.destroyed.push((handle, thread::current().id()));
        state.stats.destroyed += 1;
    }

    fn make_current(&self, handle: Option<NativeHandle>) {
        let here = thread::current().id();
        let mut state = self.state.lock();

        if let Some(previous) = state.current.remove(&here) {
            if let Some(window) = state.windows.get_mut(&previous) {
                window.current_on = None;
            }
        }

        let Some(handle) = handle else {
            return;
        };

        let Some(window) = state.windows.get_mut(&handle) else {
            log::warn!("make_current on unknown {handle:?}");
            return;
        };
        let elsewhere = window.current_on.is_some_and(|t| t != here);
        window.current_on = Some(here);
        state.current.insert(here, handle);

        if elsewhere {
            log::error!("{handle:?} made current on two threads");
            state.stats.violations += 1;
        }
    }

    fn load_functions(&self) -> Result<()> {
        if self.config.fail_load {
            bail!("entry points missing from driver");
        }
        let state = self.state.lock();
        if !state.current.contains_key(&thread::current().id()) {
            bail!("no context is current on this thread");
        }
        Ok(())
    }

    fn wait_events_timeout(&self, timeout: Duration) {
        let mut state = self.state.lock();
        state.check_affinity("wait_events_timeout");
        state.stats.waits += 1;

        if !state.pending_wake {
            let _ = self.wake.wait_for(&mut state, timeout);
        }
        state.pending_wake = false;
    }

    fn post_empty_event(&self) {
        let mut state = self.state.lock();
        state.pending_wake = true;
        state.stats.wakeups += 1;
        self.wake.notify_all();
    }

    fn window_should_close(&self, handle: NativeHandle) -> bool {
        self.state
            .lock()
            .windows
            .get(&handle)
            .is_none_or(|w| w.should_close)
    }

    fn set_window_should_close(&self, handle: NativeHandle, value: bool) {
        if let Some(window) = self.state.lock().windows.get_mut(&handle) {
            window.should_close = value;
        }
    }

    fn show_window(&self, handle: NativeHandle) {
        if let Some(window) = self.state.lock().windows.get_mut(&handle) {
            window.visible = true;
        }
    }

    fn swap_buffers(&self, handle: NativeHandle) {
        let close_after = self.config.close_after_swaps;
        let mut state = self.state.lock();
        let Some(window) = state.windows.get_mut(&handle) else {
            return;
        };

        window.swaps += 1;
        if close_after.is_some_and(|n| window.swaps >= n) {
            window.should_close = true;
        }
        state.stats.swaps += 1;
    }

    fn take_error(&self) -> Option<u32> {
        let mut state = self.state.lock();
        let handle = *state.current.get(&thread::current().id())?;
        state.windows.get_mut(&handle)?.errors.pop_front()
    }
}
