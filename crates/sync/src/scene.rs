use tumble_common::{Pose, Visual};

/// The renderer seam: everything the synchronizer needs from a scene is
/// "append an object", "move object N", and "clear".
///
/// Objects are addressed by insertion index, matching simulation bodies.
/// Index-addressed mutation means single-object removal is deliberately not
/// part of the contract; only a full clear is.
pub trait Scene {
    fn add_object(&mut self, visual: Visual, pose: Pose);
    fn set_pose(&mut self, index: usize, pose: Pose);
    fn clear(&mut self);
}

/// Headless scene for driving the protocol without a GPU.
///
/// Keeps visuals and poses in a plain list; used by the CLI embodiment and
/// throughout the tests.
#[derive(Debug, Default)]
pub struct TextScene {
    objects: Vec<(Visual, Pose)>,
}

impl TextScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[(Visual, Pose)] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Human-readable dump of the scene, one object per line.
    pub fn summary(&self) -> String {
        let mut out = format!("Scene: {} objects\n", self.objects.len());
        for (i, (visual, pose)) in self.objects.iter().enumerate() {
            let p = pose.position;
            let kind = match visual {
                Visual::Sphere { radius } => format!("sphere r={radius:.3}"),
                Visual::Box {
                    width,
                    height,
                    depth,
                } => format!("box {width:.3}x{height:.3}x{depth:.3}"),
            };
            out.push_str(&format!(
                "  [{i}] {kind} pos=({:.3}, {:.3}, {:.3})\n",
                p.x, p.y, p.z
            ));
        }
        out
    }
}

impl Scene for TextScene {
    fn add_object(&mut self, visual: Visual, pose: Pose) {
        self.objects.push((visual, pose));
    }

    fn set_pose(&mut self, index: usize, pose: Pose) {
        if let Some(slot) = self.objects.get_mut(index) {
            slot.1 = pose;
        }
    }

    fn clear(&mut self) {
        self.objects.clear();
    }
}
