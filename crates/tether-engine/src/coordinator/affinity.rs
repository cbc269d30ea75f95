use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::queue::{DeferredTask, Disposition, TaskQueue};

use super::phase::{Phase, PhaseCell};
use super::CoordinatorConfig;

/// Owner of the native library, the deferred task queue and the live-context
/// counter.
pub struct Coordinator {
    platform: Arc<dyn Platform>,
    queue: TaskQueue,
    live_contexts: AtomicUsize,
    affinity: ThreadId,
    phase: PhaseCell,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Initializes the native library and makes the calling thread the
    /// affinity thread.
    ///
    /// Failure is fatal: the library is terminated again and nothing is kept.
    pub fn new(platform: Arc<dyn Platform>, config: CoordinatorConfig) -> Result<Arc<Self>> {
        if let Err(err) = platform.init() {
            platform.terminate();
            return Err(Error::PlatformInit(err));
        }

        let affinity = thread::current().id();
        log::info!("native library initialized; affinity thread is {affinity:?}");

        Ok(Arc::new(Self {
            platform,
            queue: TaskQueue::new(),
            live_contexts: AtomicUsize::new(0),
            affinity,
            phase: PhaseCell::new(Phase::Initialized),
            config,
        }))
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn affinity_thread(&self) -> ThreadId {
        self.affinity
    }

    pub fn is_affinity_thread(&self) -> bool {
        thread::current().id() == self.affinity
    }

    /// Number of contexts constructed and not yet dropped.
    pub fn live_contexts(&self) -> usize {
        self.live_contexts.load(Ordering::Acquire)
    }

    /// Number of queued tasks. A hint under concurrent producers.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Queues `task` for the affinity thread and wakes its event wait.
    pub fn schedule(&self, task: DeferredTask) {
        log::trace!("scheduling {:?}", task.label());
        self.queue.add(task);
        self.platform.post_empty_event();
    }

    /// Runs every task that was queued when the call started.
    ///
    /// Tasks queued while the pass runs are left for the next one. Returns the
    /// number of tasks executed.
    pub fn execute_queue(&self) -> Result<usize> {
        self.ensure_affinity()?;
        Ok(self.drain())
    }

    /// Parks the affinity thread until every context is gone.
    ///
    /// Waits for native events (bounded by
    /// [`poll_timeout`](CoordinatorConfig::poll_timeout)) and drains the queue
    /// after each wait while contexts are alive, then drains once more to
    /// flush the last destructions.
    pub fn park_thread(&self) -> Result<()> {
        self.ensure_affinity()?;

        log::info!("parking affinity thread ({} live contexts)", self.live_contexts());
        self.phase.set(Phase::Parking);

        while self.live_contexts() > 0 {
            self.platform.wait_events_timeout(self.config.poll_timeout);
            self.drain();
        }

        self.phase.set(Phase::Draining);
        let flushed = self.drain();
        self.phase.set(Phase::Idle);

        log::info!("affinity thread released (flushed {flushed} tasks on exit)");
        Ok(())
    }

    pub(crate) fn context_created(&self) -> usize {
        self.live_contexts.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Hands a dropped context's teardown to the affinity thread.
    ///
    /// The task is queued before the counter drops: once the parking loop sees
    /// zero it only drains one more time.
    pub(crate) fn context_retired(&self, teardown: DeferredTask) -> usize {
        self.queue.add(teardown);
        let previous = self.live_contexts.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "live-context counter underflow");
        self.platform.post_empty_event();
        previous - 1
    }

    fn ensure_affinity(&self) -> Result<()> {
        let actual = thread::current().id();
        if actual != self.affinity {
            return Err(Error::NotAffinityThread {
                expected: self.affinity,
                actual,
            });
        }
        Ok(())
    }

    fn drain(&self) -> usize {
        let pending = self.queue.len();
        let mut executed = 0;
        let mut requeue = Vec::new();

        for _ in 0..pending {
            let Some(mut task) = self.queue.try_remove() else {
                break;
            };
            executed += 1;
            if task.run() == Disposition::Requeue {
                requeue.push(task);
            }
        }

        for task in requeue {
            self.queue.add(task);
        }

        if executed > 0 {
            log::trace!("executed {executed} deferred tasks");
        }
        executed
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        let live = self.live_contexts.load(Ordering::Acquire);
        if live > 0 {
            log::error!("coordinator dropped with {live} live contexts");
        }

        if self.is_affinity_thread() {
            self.drain();
        } else {
            log::error!(
                "coordinator dropped on {:?}, not the affinity thread {:?}",
                thread::current().id(),
                self.affinity
            );
        }
        while let Some(task) = self.queue.try_remove() {
            log::error!("deferred task {:?} lost: library terminated before it ran", task.label());
        }

        self.platform.terminate();
        log::info!("native library terminated");
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("affinity", &self.affinity)
            .field("live_contexts", &self.live_contexts())
            .field("pending_tasks", &self.pending_tasks())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use parking_lot::Mutex;

    use crate::error::ErrorKind;
    use crate::platform::{HeadlessConfig, HeadlessPlatform};

    /// Scheduling allowance on top of the wake-up latency.
    const SLACK: Duration = Duration::from_millis(500);

    fn headless() -> Arc<HeadlessPlatform> {
        Arc::new(HeadlessPlatform::new(HeadlessConfig::default()))
    }

    fn coordinator(platform: &Arc<HeadlessPlatform>) -> Arc<Coordinator> {
        let config = CoordinatorConfig {
            poll_timeout: Duration::from_millis(20),
        };
        Coordinator::new(platform.clone(), config).unwrap()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn init_failure_is_fatal() {
        let platform = Arc::new(HeadlessPlatform::new(HeadlessConfig {
            fail_init: true,
            ..Default::default()
        }));

        let err = Coordinator::new(platform.clone(), CoordinatorConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(platform.is_terminated());
    }

    #[test]
    fn drop_terminates_library() {
        let platform = headless();
        let coord = coordinator(&platform);
        assert_eq!(coord.phase(), Phase::Initialized);
        assert!(!platform.is_terminated());

        drop(coord);
        assert!(platform.is_terminated());
    }

    #[test]
    fn drop_flushes_pending_tasks() {
        let platform = headless();
        let coord = coordinator(&platform);
        let ran = Arc::new(Mutex::new(false));

        let flag = Arc::clone(&ran);
        coord.schedule(DeferredTask::once("flag", move || *flag.lock() = true));
        drop(coord);

        assert!(*ran.lock());
    }

    #[test]
    fn drop_off_affinity_thread_discards_without_running() {
        let platform = headless();
        let coord = coordinator(&platform);
        let ran = Arc::new(Mutex::new(false));

        let flag = Arc::clone(&ran);
        coord.schedule(DeferredTask::once("flag", move || *flag.lock() = true));
        thread::spawn(move || drop(coord)).join().unwrap();

        assert!(!*ran.lock());
        assert!(platform.is_terminated());
    }

    // ── execute_queue ─────────────────────────────────────────────────────

    #[test]
    fn drains_tasks_from_many_threads_in_enqueue_order() {
        let platform = headless();
        let coord = coordinator(&platform);
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 1..=3 {
            let remote = Arc::clone(&coord);
            let order = Arc::clone(&order);
            thread::spawn(move || {
                remote.schedule(DeferredTask::once("record", move || order.lock().push(n)));
            })
            .join()
            .unwrap();
        }

        assert_eq!(coord.pending_tasks(), 3);
        assert_eq!(coord.execute_queue().unwrap(), 3);
        assert_eq!(*order.lock(), vec![1, 2, 3]);
        assert_eq!(coord.pending_tasks(), 0);
    }

    #[test]
    fn task_runs_exactly_once() {
        let platform = headless();
        let coord = coordinator(&platform);
        let hits = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&hits);
        coord.schedule(DeferredTask::once("hit", move || *counter.lock() += 1));

        assert_eq!(coord.execute_queue().unwrap(), 1);
        assert_eq!(coord.execute_queue().unwrap(), 0);
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn tasks_queued_during_a_pass_wait_for_the_next() {
        let platform = headless();
        let coord = coordinator(&platform);
        let order = Arc::new(Mutex::new(Vec::new()));

        let inner_coord = Arc::downgrade(&coord);
        let inner_order = Arc::clone(&order);
        coord.schedule(DeferredTask::once("outer", move || {
            inner_order.lock().push("outer");
            if let Some(coord) = inner_coord.upgrade() {
                let order = Arc::clone(&inner_order);
                coord.schedule(DeferredTask::once("inner", move || order.lock().push("inner")));
            }
        }));

        assert_eq!(coord.execute_queue().unwrap(), 1);
        assert_eq!(*order.lock(), vec!["outer"]);
        assert_eq!(coord.execute_queue().unwrap(), 1);
        assert_eq!(*order.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn requeued_task_runs_once_per_pass() {
        let platform = headless();
        let coord = coordinator(&platform);
        let runs = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&runs);
        coord.schedule(DeferredTask::repeating("poll", move || {
            let mut runs = counter.lock();
            *runs += 1;
            if *runs < 3 { Disposition::Requeue } else { Disposition::Discard }
        }));

        for expected in 1..=3 {
            assert_eq!(coord.execute_queue().unwrap(), 1);
            assert_eq!(*runs.lock(), expected);
        }
        assert_eq!(coord.pending_tasks(), 0);
    }

    #[test]
    fn execute_queue_rejects_other_threads() {
        let platform = headless();
        let coord = coordinator(&platform);

        let remote = Arc::clone(&coord);
        let err = thread::spawn(move || remote.execute_queue().unwrap_err())
            .join()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Misuse);
        assert!(matches!(err, Error::NotAffinityThread { .. }));
    }

    // ── park_thread ───────────────────────────────────────────────────────

    #[test]
    fn park_without_contexts_returns_immediately() {
        let platform = headless();
        let coord = coordinator(&platform);
        let hits = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&hits);
        coord.schedule(DeferredTask::once("last", move || *counter.lock() += 1));

        coord.park_thread().unwrap();
        assert_eq!(coord.phase(), Phase::Idle);
        assert_eq!(*hits.lock(), 1);
        assert_eq!(platform.stats().waits, 0);
    }

    #[test]
    fn park_holds_while_contexts_are_live() {
        let platform = headless();
        let coord = coordinator(&platform);
        coord.context_created();

        let remote = Arc::clone(&coord);
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(80));
            let released = Instant::now();
            remote.context_retired(DeferredTask::once("noop", || {}));
            released
        });

        coord.park_thread().unwrap();
        let returned = Instant::now();
        let released = releaser.join().unwrap();

        assert!(returned >= released);
        assert!(returned - released < coord.config().poll_timeout + SLACK);
        assert_eq!(coord.live_contexts(), 0);
        assert_eq!(coord.pending_tasks(), 0);
        assert!(platform.stats().waits >= 1);
    }

    #[test]
    fn last_release_wakes_a_long_wait() {
        let platform = headless();
        let coord = Coordinator::new(
            platform.clone(),
            CoordinatorConfig {
                poll_timeout: Duration::from_secs(5),
            },
        )
        .unwrap();
        coord.context_created();

        let remote = Arc::clone(&coord);
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let released = Instant::now();
            remote.context_retired(DeferredTask::once("noop", || {}));
            released
        });

        coord.park_thread().unwrap();
        let returned = Instant::now();
        let released = releaser.join().unwrap();

        assert!(returned - released < SLACK);
        assert_eq!(coord.phase(), Phase::Idle);
        assert!(platform.stats().wakeups >= 1);
    }

    #[test]
    fn park_rejects_other_threads() {
        let platform = headless();
        let coord = coordinator(&platform);

        let remote = Arc::clone(&coord);
        let result = thread::spawn(move || remote.park_thread()).join().unwrap();
        assert!(result.is_err());
        assert_eq!(coord.phase(), Phase::Initialized);
    }
}
