//! wgpu scene backend for the sandbox.
//!
//! Renders a solid ground plane with grid lines over it, plus instanced unit
//! meshes (sphere, cube) scaled by each object's visual. Implements the synchronizer's `Scene` trait, so the
//! physics protocol drives it like any other scene.
//!
//! # Invariants
//! - The renderer never talks to the physics worker; poses arrive only
//!   through `Scene::set_pose`.
//! - Camera motion lives entirely on the render thread.

mod camera;
mod gpu;
mod mesh;
mod scene;
mod shaders;

pub use camera::OrbitCamera;
pub use gpu::SandboxRenderer;
pub use scene::GpuScene;
