//! Physics worker: owns the simulation world on a dedicated thread and
//! drives it with a drift-corrected fixed-rate scheduler.
//!
//! # Invariants
//! - The simulation world never leaves the worker thread; all interaction is
//!   through the command and frame channels.
//! - Commands are serviced as they arrive and may interleave with steps.
//! - The loop exits when every command sender has been dropped.

mod worker;

pub use worker::{PhysicsWorker, WorkerConfig, WorkerError};
