use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::platform::{ContextVersion, NativeHandle, Platform};
use crate::queue::DeferredTask;

use super::binding::{self, Binding};
use super::ContextConfig;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Owned native graphics context.
///
/// At most one handle is current per thread, and a handle is current on at
/// most one thread. Dropping the handle unbinds it from the dropping thread,
/// queues the native destroy for the affinity thread and decrements the
/// coordinator's live-context counter.
pub struct ContextHandle {
    id: u64,
    handle: NativeHandle,
    version: ContextVersion,
    owner: ThreadId,
    current_on: Mutex<Option<ThreadId>>,
    coordinator: Arc<Coordinator>,
}

impl ContextHandle {
    /// Creates a hidden window/context pair and loads graphics entry points.
    ///
    /// The context is bound to the calling thread only for the duration of
    /// the function load; whatever was current before is restored. On failure
    /// the live-context counter is left untouched.
    pub fn new(coordinator: &Arc<Coordinator>, config: ContextConfig) -> Result<Self> {
        let version = config.version;
        if !version.is_known() {
            return Err(Error::InvalidVersion {
                major: version.major,
                minor: version.minor,
            });
        }

        let platform = coordinator.platform();
        let handle = platform
            .create_window(&config.hints())
            .map_err(Error::ContextCreation)?;

        let previous = binding::current();
        platform.make_current(Some(handle));
        let loaded = platform.load_functions();
        platform.make_current(previous.map(|b| b.handle));

        if let Err(err) = loaded {
            coordinator.schedule(teardown(Arc::clone(platform), handle));
            return Err(Error::FunctionLoading(err));
        }

        let live = coordinator.context_created();
        log::info!("created {version} context {handle:?} ({live} live)");

        Ok(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            handle,
            version,
            owner: thread::current().id(),
            current_on: Mutex::new(None),
            coordinator: Arc::clone(coordinator),
        })
    }

    pub fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn version(&self) -> ContextVersion {
        self.version
    }

    /// Thread the handle was constructed on.
    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Binds the context to the calling thread.
    ///
    /// Fails if it is current on another thread, or if another context is
    /// current here. Re-binding on the same thread is a no-op.
    pub fn make_current(&self) -> Result<()> {
        let here = thread::current().id();
        let mut current_on = self.current_on.lock();

        match *current_on {
            Some(thread) if thread == here => return Ok(()),
            Some(thread) => return Err(Error::CurrentElsewhere(thread)),
            None => {}
        }
        if binding::current().is_some() {
            return Err(Error::ThreadBusy);
        }

        self.platform().make_current(Some(self.handle));
        binding::set_current(Some(Binding {
            id: self.id,
            handle: self.handle,
        }));
        *current_on = Some(here);

        log::debug!("{:?} current on {here:?}", self.handle);
        Ok(())
    }

    /// Unbinds the context if it is current on the calling thread.
    ///
    /// Returns `true` if it was.
    pub fn release_current(&self) -> bool {
        let mut current_on = self.current_on.lock();
        if *current_on != Some(thread::current().id()) {
            return false;
        }

        self.unbind_here();
        *current_on = None;
        true
    }

    pub fn is_current(&self) -> bool {
        *self.current_on.lock() == Some(thread::current().id())
    }

    /// Thread the context is current on, if any.
    pub fn current_thread(&self) -> Option<ThreadId> {
        *self.current_on.lock()
    }

    pub fn should_close(&self) -> bool {
        self.platform().window_should_close(self.handle)
    }

    pub fn request_close(&self) {
        self.platform().set_window_should_close(self.handle, true);
    }

    pub(crate) fn platform(&self) -> &Arc<dyn Platform> {
        self.coordinator.platform()
    }

    fn unbind_here(&self) {
        self.platform().make_current(None);
        if binding::current().is_some_and(|b| b.id == self.id) {
            binding::set_current(None);
        }
    }
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        let here = thread::current().id();
        let bound = *self.current_on.get_mut();
        match bound {
            Some(thread) if thread == here => self.unbind_here(),
            Some(thread) => log::warn!("{:?} dropped while current on {thread:?}", self.handle),
            None => {}
        }

        let task = teardown(Arc::clone(self.platform()), self.handle);
        let live = self.coordinator.context_retired(task);
        log::debug!("released {:?} on {here:?} ({live} live)", self.handle);
    }
}

impl std::fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextHandle")
            .field("handle", &self.handle)
            .field("version", &self.version)
            .field("owner", &self.owner)
            .field("current_on", &self.current_thread())
            .finish_non_exhaustive()
    }
}

fn teardown(platform: Arc<dyn Platform>, handle: NativeHandle) -> DeferredTask {
    DeferredTask::once("destroy context", move || {
        platform.destroy_window(handle);
        log::debug!("destroyed {handle:?}");
    })
}
