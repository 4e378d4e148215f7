//! Cross-thread protocol between the render loop and the physics worker.
//!
//! # Invariants
//! - A [`FrameBuffers`] pair has exactly one owner at any instant. Ownership
//!   moves with the message that carries it; the sender keeps nothing.
//! - At most one frame request is in flight at a time, so no correlation ids
//!   are needed anywhere in the message set.

mod buffers;
mod message;

pub use buffers::{FrameBuffers, ProtocolError, DEFAULT_CAPACITY};
pub use message::{Command, FrameUpdate};
