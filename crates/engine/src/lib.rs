//! Simulation engine adapter: wraps rapier3d behind the small contract the
//! physics worker needs: add body, remove all, fixed-step with catch-up.
//!
//! # Invariants
//! - Body identity is the insertion index; it is stable until `remove_all`.
//! - Only `step` mutates body poses.
//! - Stepping is deterministic for identical command history and deltas.

mod world;

pub use world::SimWorld;
