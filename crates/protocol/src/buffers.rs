use serde::{Deserialize, Serialize};
use tumble_common::Pose;

/// Default slot capacity of a buffer pair.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Errors from direct slot access on a buffer pair.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("slot {slot} out of range (capacity {capacity})")]
    SlotOutOfRange { slot: usize, capacity: usize },
}

/// The flat position/rotation arrays exchanged between the render thread and
/// the physics worker.
///
/// Layout matches the wire format: 3 floats per slot for positions, 4 floats
/// per slot (quaternion x, y, z, w) for rotations. The pair is allocated once
/// per session and then ping-pongs between the two threads by move; it is
/// deliberately not `Clone`, so a thread that sent it cannot keep touching it.
#[derive(Debug, Serialize, Deserialize)]
pub struct FrameBuffers {
    positions: Vec<f32>,
    rotations: Vec<f32>,
    capacity: usize,
}

impl Default for FrameBuffers {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl FrameBuffers {
    /// Allocate a pair with room for `capacity` poses.
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: vec![0.0; capacity * 3],
            rotations: vec![0.0; capacity * 4],
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Write one pose into `slot`.
    pub fn write_pose(&mut self, slot: usize, pose: &Pose) -> Result<(), ProtocolError> {
        if slot >= self.capacity {
            return Err(ProtocolError::SlotOutOfRange {
                slot,
                capacity: self.capacity,
            });
        }
        let p = slot * 3;
        self.positions[p] = pose.position.x;
        self.positions[p + 1] = pose.position.y;
        self.positions[p + 2] = pose.position.z;
        let r = slot * 4;
        self.rotations[r] = pose.rotation.x;
        self.rotations[r + 1] = pose.rotation.y;
        self.rotations[r + 2] = pose.rotation.z;
        self.rotations[r + 3] = pose.rotation.w;
        Ok(())
    }

    /// Read the pose stored in `slot`.
    pub fn pose(&self, slot: usize) -> Option<Pose> {
        if slot >= self.capacity {
            return None;
        }
        let p = slot * 3;
        let r = slot * 4;
        Some(Pose {
            position: glam::Vec3::new(
                self.positions[p],
                self.positions[p + 1],
                self.positions[p + 2],
            ),
            rotation: glam::Quat::from_xyzw(
                self.rotations[r],
                self.rotations[r + 1],
                self.rotations[r + 2],
                self.rotations[r + 3],
            ),
        })
    }

    /// Fill slots from the front with `poses`, stopping at capacity.
    /// Returns the number of poses written. Slots past the written range are
    /// left untouched.
    pub fn fill<'a, I>(&mut self, poses: I) -> usize
    where
        I: IntoIterator<Item = Pose>,
    {
        let mut written = 0;
        for pose in poses.into_iter().take(self.capacity) {
            // In range by construction of the take() above.
            let _ = self.write_pose(written, &pose);
            written += 1;
        }
        written
    }

    /// Raw position floats, 3 per slot.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Raw rotation floats, 4 per slot.
    pub fn rotations(&self) -> &[f32] {
        &self.rotations
    }
}
