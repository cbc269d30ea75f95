use std::cell::Cell;

use crate::platform::NativeHandle;

/// The context current on this thread, as tracked by the core.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) struct Binding {
    pub id: u64,
    pub handle: NativeHandle,
}

thread_local! {
    static CURRENT: Cell<Option<Binding>> = const { Cell::new(None) };
}

pub(super) fn current() -> Option<Binding> {
    CURRENT.with(Cell::get)
}

pub(super) fn set_current(binding: Option<Binding>) {
    CURRENT.with(|cell| cell.set(binding));
}
