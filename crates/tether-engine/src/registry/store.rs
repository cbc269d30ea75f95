use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

type Key = (TypeId, ThreadId);
type Erased = Arc<dyn Any + Send + Sync>;

struct Entry {
    value: Erased,
    refs: usize,
}

static GLOBAL: state::InitCell<Registry> = state::InitCell::new();

/// Keyed store of thread-confined, reference-counted resources.
///
/// Constructors run outside the index lock, so a resource may itself look
/// things up in the registry while being built.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<Key, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, created on first use.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    /// Returns this thread's `T`, default-constructing it on first use.
    ///
    /// Every call adds one reference.
    pub fn get_or_create<T>(&self) -> Arc<T>
    where
        T: Default + Send + Sync + 'static,
    {
        self.get_or_create_with(T::default)
    }

    /// Like [`get_or_create`](Self::get_or_create) with an explicit constructor.
    pub fn get_or_create_with<T, F>(&self, init: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.acquire::<T>() {
            return existing;
        }

        // No other thread can insert under our key, so the gap is harmless.
        let value = Arc::new(init());
        let erased: Erased = value.clone();
        self.entries
            .lock()
            .insert(key::<T>(), Entry { value: erased, refs: 1 });

        log::debug!("registry: created {} for {:?}", type_name::<T>(), thread::current().id());
        value
    }

    /// Installs `value` as this thread's `T` with a single reference.
    ///
    /// A previous entry is released.
    pub fn set<T>(&self, value: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        let erased: Erased = value;
        let previous = self
            .entries
            .lock()
            .insert(key::<T>(), Entry { value: erased, refs: 1 });

        if previous.is_some() {
            log::debug!("registry: replaced {} for {:?}", type_name::<T>(), thread::current().id());
        }
        // `previous` drops here, outside the lock.
    }

    /// Returns this thread's `T` and adds a reference, if it exists.
    pub fn acquire<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(&key::<T>())?;
        entry.refs += 1;
        Some(downcast(&entry.value))
    }

    /// Returns this thread's `T` without touching its reference count.
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.entries
            .lock()
            .get(&key::<T>())
            .map(|entry| downcast(&entry.value))
    }

    /// Drops one reference to this thread's `T`.
    ///
    /// Returns `true` if that was the last one and the entry was removed.
    pub fn remove_reference<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        let removed = {
            let mut entries = self.entries.lock();
            let key = key::<T>();

            let Some(entry) = entries.get_mut(&key) else {
                log::warn!(
                    "registry: remove_reference on absent {} for {:?}",
                    type_name::<T>(),
                    thread::current().id()
                );
                return false;
            };

            entry.refs -= 1;
            if entry.refs > 0 {
                return false;
            }
            entries.remove(&key)
        };

        log::debug!("registry: released {} for {:?}", type_name::<T>(), thread::current().id());
        // Dropped outside the lock: the value's destructor may be arbitrary.
        drop(removed);
        true
    }

    /// Reference count of this thread's `T` (0 when absent).
    pub fn ref_count<T>(&self) -> usize
    where
        T: Send + Sync + 'static,
    {
        self.entries
            .lock()
            .get(&key::<T>())
            .map_or(0, |entry| entry.refs)
    }

    /// Number of entries across all threads.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn key<T: 'static>() -> Key {
    (TypeId::of::<T>(), thread::current().id())
}

fn downcast<T>(value: &Erased) -> Arc<T>
where
    T: Send + Sync + 'static,
{
    match Arc::clone(value).downcast::<T>() {
        Ok(value) => value,
        Err(_) => unreachable!("registry entries are keyed by TypeId"),
    }
}
