use std::fmt;

/// What the drain loop does with a task after running it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Disposition {
    /// Free the task.
    Discard,
    /// Put the task back at the tail; it runs again on the next drain pass.
    Requeue,
}

/// A unit of work that must run on the affinity thread.
pub struct DeferredTask {
    label: &'static str,
    work: Box<dyn FnMut() -> Disposition + Send>,
}

impl DeferredTask {
    /// Wraps a closure that runs exactly once.
    pub fn once<F>(label: &'static str, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut f = Some(f);
        Self {
            label,
            work: Box::new(move || {
                if let Some(f) = f.take() {
                    f();
                }
                Disposition::Discard
            }),
        }
    }

    /// Wraps a closure that decides after each run whether to stay queued.
    pub fn repeating<F>(label: &'static str, f: F) -> Self
    where
        F: FnMut() -> Disposition + Send + 'static,
    {
        Self {
            label,
            work: Box::new(f),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn run(&mut self) -> Disposition {
        (self.work)()
    }
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTask")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
