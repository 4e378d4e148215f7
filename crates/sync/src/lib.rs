//! Render-side half of the physics protocol.
//!
//! # Invariants
//! - At most one frame request is outstanding; the pending flag guards it.
//! - Renderable `i` and simulation body `i` are the same logical object.
//! - The render loop never blocks on the worker; stale poses persist until
//!   the next reply.

mod action;
mod rng;
mod scene;
mod sync;

pub use action::Action;
pub use rng::SpawnRng;
pub use scene::{Scene, TextScene};
pub use sync::Synchronizer;
