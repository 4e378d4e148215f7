use tumble_common::{Pose, Visual};
use tumble_sync::Scene;

/// GPU-side scene: the list of spawned objects the renderer draws each
/// frame. Mutated only through the `Scene` trait, by the synchronizer.
#[derive(Debug, Default)]
pub struct GpuScene {
    objects: Vec<(Visual, Pose)>,
}

impl GpuScene {
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
}

impl Scene for GpuScene {
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
