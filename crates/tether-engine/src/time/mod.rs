//! Frame timing for worker loops.
//!
//! Each worker owns one `FrameClock`: it measures how long start-up took,
//! ticks once per presented frame, and summarizes the run at teardown.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameSummary, FrameTime};
