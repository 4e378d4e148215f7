use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position and orientation of a simulated body or its rendered proxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    /// Pose at the given position with identity rotation.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Collision shape descriptor handed to the simulation engine.
///
/// Dimensions must be positive; non-positive dimensions are a caller
/// contract violation, not a handled error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vec3 },
}

impl Shape {
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Cuboid from full extents (width, height, depth).
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Self::Cuboid {
            half_extents: Vec3::new(width * 0.5, height * 0.5, depth * 0.5),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::Sphere { radius } => *radius <= 0.0,
            Self::Cuboid { half_extents } => half_extents.min_element() <= 0.0,
        }
    }
}

/// Render-side geometry description for a spawned object.
///
/// Mirrors [`Shape`] but keeps the full extents the renderer scales its
/// unit meshes by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Visual {
    Sphere { radius: f32 },
    Box { width: f32, height: f32, depth: f32 },
}

impl Visual {
    /// Scale factor applied to a unit mesh (unit-diameter sphere, unit cube).
    pub fn mesh_scale(&self) -> Vec3 {
        match self {
            Self::Sphere { radius } => Vec3::splat(radius * 2.0),
            Self::Box {
                width,
                height,
                depth,
            } => Vec3::new(*width, *height, *depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_default_is_identity() {
        let p = Pose::default();
        assert_eq!(p.position, Vec3::ZERO);
        assert_eq!(p.rotation, Quat::IDENTITY);
    }

    #[test]
    fn cuboid_halves_extents() {
        let s = Shape::cuboid(1.0, 2.0, 3.0);
        match s {
            Shape::Cuboid { half_extents } => {
                assert_eq!(half_extents, Vec3::new(0.5, 1.0, 1.5));
            }
            _ => panic!("expected cuboid"),
        }
    }

    #[test]
    fn degenerate_shapes_detected() {
        assert!(Shape::sphere(0.0).is_degenerate());
        assert!(Shape::cuboid(1.0, -1.0, 1.0).is_degenerate());
        assert!(!Shape::sphere(0.1).is_degenerate());
    }

    #[test]
    fn visual_mesh_scale() {
        let v = Visual::Sphere { radius: 0.5 };
        assert_eq!(v.mesh_scale(), Vec3::ONE);
        let b = Visual::Box {
            width: 1.0,
            height: 2.0,
            depth: 3.0,
        };
        assert_eq!(b.mesh_scale(), Vec3::new(1.0, 2.0, 3.0));
    }
}
