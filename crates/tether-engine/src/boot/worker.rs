use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::context::{ContextConfig, ContextHandle};
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::platform::NativeHandle;
use crate::registry::Registry;
use crate::time::FrameClock;
use crate::window::Window;

static NEXT_WORKER: AtomicUsize = AtomicUsize::new(0);

type StartFn = Box<dyn FnOnce() + Send>;
type UpdateFn = Box<dyn FnMut() + Send>;

/// A context plus the callbacks that will drive it on its own thread.
pub struct Bootstrapper {
    context: Arc<ContextHandle>,
    start: StartFn,
    update: UpdateFn,
    name: Option<String>,
}

impl Bootstrapper {
    /// Creates the context on the calling thread.
    pub fn new<S, U>(
        coordinator: &Arc<Coordinator>,
        config: ContextConfig,
        start: S,
        update: U,
    ) -> Result<Self>
    where
        S: FnOnce() + Send + 'static,
        U: FnMut() + Send + 'static,
    {
        let context = ContextHandle::new(coordinator, config)?;
        Ok(Self::with_context(Arc::new(context), start, update))
    }

    pub fn with_context<S, U>(context: Arc<ContextHandle>, start: S, update: U) -> Self
    where
        S: FnOnce() + Send + 'static,
        U: FnMut() + Send + 'static,
    {
        Self {
            context,
            start: Box::new(start),
            update: Box::new(update),
            name: None,
        }
    }

    /// Names the worker thread. Defaults to `worker-N`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn context(&self) -> &Arc<ContextHandle> {
        &self.context
    }

    /// Spawns the worker thread.
    ///
    /// The returned handle may be dropped to let the worker run on its own;
    /// the coordinator's live-context count keeps tracking its context.
    pub fn boot_thread(mut self) -> io::Result<WorkerHandle> {
        let name = self
            .name
            .take()
            .unwrap_or_else(|| format!("worker-{}", NEXT_WORKER.fetch_add(1, Ordering::Relaxed)));
        let handle = self.context.native_handle();

        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let result = self.park_thread();
                if let Err(err) = &result {
                    log::error!("worker stopped: {err}");
                }
                result
            })?;

        Ok(WorkerHandle { thread, handle })
    }

    fn park_thread(self) -> Result<()> {
        let Bootstrapper {
            context,
            start,
            mut update,
            ..
        } = self;
        let registry = Registry::global();
        let mut clock = FrameClock::new();

        log::info!("branched worker thread for {:?}", context.native_handle());
        registry.set(Arc::clone(&context));
        let mut held = Held::new(registry);
        held.contexts += 1;

        let bound = registry.acquire::<ContextHandle>().ok_or(Error::NoContext)?;
        held.contexts += 1;
        bound.make_current()?;
        held.bound = Some(Arc::clone(&bound));

        log::info!("initializing window utilities");
        let window = registry.get_or_create::<Window>();
        held.windows += 1;
        log::debug!("window utilities ready");

        log::info!("invoking application start");
        start();
        window.show();

        let init = clock.mark_initialized();
        log::info!("initialization completed ({:.3}s)", init.as_secs_f64());

        while !window.should_close() {
            update();

            if let Some(code) = bound.platform().take_error() {
                log::warn!("graphics error flag set on {:?}: {code:#06x}", bound.native_handle());
            }

            window.swap_buffers();
            let frame = clock.tick();
            log::trace!("frame {} presented ({:.2} ms)", frame.frame_index, frame.dt * 1000.0);
        }

        let summary = clock.summary();
        log::info!(
            "window closed after {} frames (mean {:.2} ms)",
            summary.frames,
            summary.mean_dt * 1000.0
        );
        Ok(())
    }
}

impl std::fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("context", &self.context)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Binding and registry references taken by a worker, released on scope exit
/// (including unwinding) in reverse acquisition order.
///
/// The context is unbound first: whoever drops the last `Arc` may be another
/// thread, and it must find the context current nowhere.
struct Held<'r> {
    registry: &'r Registry,
    bound: Option<Arc<ContextHandle>>,
    contexts: usize,
    windows: usize,
}

impl<'r> Held<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            bound: None,
            contexts: 0,
            windows: 0,
        }
    }
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.bound.take() {
            context.release_current();
        }
        for _ in 0..self.windows {
            self.registry.remove_reference::<Window>();
        }
        for _ in 0..self.contexts {
            self.registry.remove_reference::<ContextHandle>();
        }
    }
}

/// Owned handle to a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    thread: JoinHandle<Result<()>>,
    handle: NativeHandle,
}

impl WorkerHandle {
    pub fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn thread(&self) -> &thread::Thread {
        self.thread.thread()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker. `Err` carries the panic payload of a callback.
    pub fn join(self) -> thread::Result<Result<()>> {
        self.thread.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::coordinator::{CoordinatorConfig, Phase};
    use crate::platform::{HeadlessConfig, HeadlessPlatform};

    fn setup(close_after_swaps: u64) -> (Arc<HeadlessPlatform>, Arc<Coordinator>) {
        let platform = Arc::new(HeadlessPlatform::new(HeadlessConfig {
            close_after_swaps: Some(close_after_swaps),
            ..Default::default()
        }));
        let coord = Coordinator::new(
            platform.clone(),
            CoordinatorConfig {
                poll_timeout: Duration::from_millis(20),
            },
        )
        .unwrap();
        (platform, coord)
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn runs_start_once_and_update_per_frame() {
        let (platform, coord) = setup(5);
        let starts = Arc::new(Mutex::new(0));
        let updates = Arc::new(Mutex::new(0));

        let s = Arc::clone(&starts);
        let u = Arc::clone(&updates);
        let boot = Bootstrapper::new(
            &coord,
            ContextConfig::default(),
            move || *s.lock() += 1,
            move || *u.lock() += 1,
        )
        .unwrap()
        .name("lifecycle");
        let handle = boot.context().native_handle();
        assert_eq!(coord.live_contexts(), 1);

        let worker = boot.boot_thread().unwrap();
        assert_eq!(worker.thread().name(), Some("lifecycle"));
        coord.park_thread().unwrap();
        worker.join().unwrap().unwrap();

        assert_eq!(*starts.lock(), 1);
        assert_eq!(*updates.lock(), 5);
        assert_eq!(coord.live_contexts(), 0);
        assert_eq!(coord.phase(), Phase::Idle);
        assert_eq!(platform.destroyed_on(handle), Some(thread::current().id()));
        assert_eq!(platform.stats().violations, 0);
    }

    #[test]
    fn start_sees_bound_hidden_context() {
        let (platform, coord) = setup(1);
        let observed = Arc::new(Mutex::new(None));

        let context = Arc::new(ContextHandle::new(&coord, ContextConfig::default()).unwrap());
        let handle = context.native_handle();

        let probe = Arc::clone(&platform);
        let seen = Arc::clone(&observed);
        let boot = Bootstrapper::with_context(
            context,
            move || {
                let here = thread::current().id();
                *seen.lock() = Some((probe.current_on(here), probe.is_visible(handle)));
            },
            || {},
        );

        let worker = boot.boot_thread().unwrap();
        coord.park_thread().unwrap();
        worker.join().unwrap().unwrap();

        assert_eq!(*observed.lock(), Some((Some(handle), false)));
    }

    #[test]
    fn graphics_errors_do_not_stop_the_loop() {
        let (platform, coord) = setup(3);
        let updates = Arc::new(Mutex::new(0));

        let u = Arc::clone(&updates);
        let boot = Bootstrapper::new(&coord, ContextConfig::default(), || {}, move || {
            *u.lock() += 1;
        })
        .unwrap();
        platform.inject_error(boot.context().native_handle(), 0x0500);
        platform.inject_error(boot.context().native_handle(), 0x0502);

        let worker = boot.boot_thread().unwrap();
        coord.park_thread().unwrap();
        worker.join().unwrap().unwrap();

        assert_eq!(*updates.lock(), 3);
    }

    #[test]
    fn three_workers_release_everything() {
        let (platform, coord) = setup(4);

        let workers: Vec<_> = (0..3)
            .map(|_| {
                Bootstrapper::new(&coord, ContextConfig::default(), || {}, || {})
                    .unwrap()
                    .boot_thread()
                    .unwrap()
            })
            .collect();

        coord.park_thread().unwrap();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }

        let stats = platform.stats();
        assert_eq!(stats.created, 3);
        assert_eq!(stats.destroyed, 3);
        assert_eq!(stats.violations, 0);
        assert_eq!(coord.pending_tasks(), 0);
    }

    #[test]
    fn exited_worker_leaves_context_unbound() {
        let (platform, coord) = setup(2);
        let boot = Bootstrapper::new(&coord, ContextConfig::default(), || {}, || {}).unwrap();
        let context = Arc::clone(boot.context());

        let worker = boot.boot_thread().unwrap();
        let worker_id = worker.thread().id();
        worker.join().unwrap().unwrap();

        assert_eq!(context.current_thread(), None);
        assert_eq!(platform.current_on(worker_id), None);
        assert_eq!(coord.live_contexts(), 1);

        context.make_current().unwrap();
        assert!(context.release_current());
        drop(context);
        coord.park_thread().unwrap();
        assert_eq!(platform.stats().live_windows, 0);
        assert_eq!(platform.stats().violations, 0);
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn panicking_update_still_releases_context() {
        let (platform, coord) = setup(10);

        let worker = Bootstrapper::new(&coord, ContextConfig::default(), || {}, || {
            panic!("update blew up");
        })
        .unwrap()
        .boot_thread()
        .unwrap();

        let worker_id = worker.thread().id();
        coord.park_thread().unwrap();
        assert!(worker.join().is_err());
        assert_eq!(coord.live_contexts(), 0);
        assert_eq!(platform.stats().destroyed, 1);
        assert_eq!(platform.current_on(worker_id), None);
    }

    #[test]
    fn context_bound_elsewhere_fails_the_worker() {
        let (platform, coord) = setup(1);
        let boot = Bootstrapper::new(&coord, ContextConfig::default(), || {}, || {}).unwrap();
        let context = Arc::clone(boot.context());
        context.make_current().unwrap();

        let result = boot.boot_thread().unwrap().join().unwrap();
        assert!(matches!(result, Err(Error::CurrentElsewhere(_))));
        assert_eq!(coord.live_contexts(), 1);

        context.release_current();
        drop(context);
        coord.park_thread().unwrap();
        assert_eq!(platform.stats().live_windows, 0);
        assert_eq!(platform.stats().violations, 0);
    }
}
