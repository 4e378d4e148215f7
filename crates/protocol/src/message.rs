use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::buffers::FrameBuffers;

/// Commands sent from the render thread to the physics worker.
///
/// All variants are fire-and-forget except `RequestFrame`, which loans the
/// buffer pair to the worker and is answered with a [`FrameUpdate`].
#[derive(Debug, Serialize, Deserialize)]
pub enum Command {
    /// Create a dynamic sphere body at `position`.
    AddSphere { position: Vec3, radius: f32 },
    /// Create a dynamic box body at `position`. Dimensions are full extents.
    AddBox {
        position: Vec3,
        width: f32,
        height: f32,
        depth: f32,
    },
    /// Remove every dynamic body; indices restart from zero.
    Reset,
    /// Ask the worker to fill `buffers` with current body poses.
    RequestFrame { buffers: FrameBuffers },
}

/// The worker's reply to `Command::RequestFrame`.
///
/// `count` is the number of live bodies whose poses were written; slots at
/// `count` and beyond hold stale data and must not be applied.
#[derive(Debug, Serialize, Deserialize)]
pub struct FrameUpdate {
    pub count: usize,
    pub buffers: FrameBuffers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_moves_the_buffers() {
        let buffers = FrameBuffers::new(8);
        let cmd = Command::RequestFrame { buffers };
        // `buffers` is gone here; the only way back is through the message.
        match cmd {
            Command::RequestFrame { buffers } => assert_eq!(buffers.capacity(), 8),
            _ => panic!("expected RequestFrame"),
        }
    }

    #[test]
    fn commands_are_serializable() {
        let cmd = Command::AddSphere {
            position: Vec3::new(0.0, 3.0, 0.0),
            radius: 0.1,
        };
        let json = serde_json::to_string(&cmd);
        assert!(json.is_ok());
    }
}
