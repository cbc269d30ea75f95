//! Worker bootstrapping.
//!
//! A [`Bootstrapper`] pairs a context with the application's `start` and
//! `update` callbacks and runs them on a dedicated thread:
//!
//! 1. install the context in the per-thread registry and make it current
//! 2. create the thread's [`Window`](crate::window::Window) utility
//! 3. run `start`, then reveal the window
//! 4. run `update` and swap buffers every frame until the window should close
//! 5. release every registry reference the thread took
//!
//! Panics in the callbacks are not caught. They unwind the worker, which still
//! releases its references (so the context's teardown reaches the affinity
//! thread), and surface through [`WorkerHandle::join`].

mod worker;

pub use worker::{Bootstrapper, WorkerHandle};
