//! Shared leaf types for the tumble sandbox.
//!
//! Everything in here is plain data: poses, shape descriptors, and the
//! render-side visual description. No crate above this one needs to agree
//! on anything else.

mod types;

pub use types::{Pose, Shape, Visual};
