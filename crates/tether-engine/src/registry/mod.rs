//! Per-thread resource registry.
//!
//! Resources are keyed by `(type, thread)`. Each thread sees its own instance
//! of a type and counts its own references to it; threads never observe each
//! other's entries. Only the index itself is shared, behind a lock.

mod store;

pub use store::Registry;
