use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use tumble_common::{Pose, Shape};

/// The simulation world: rapier pipeline state plus the insertion-ordered
/// list of dynamic body handles.
///
/// The floor is a fixed half-space at y = 0 created at construction; it is
/// not part of the body list and survives `remove_all`.
pub struct SimWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Dynamic bodies in insertion order. Index into this list is the body's
    /// public identity.
    live: Vec<RigidBodyHandle>,
    /// Wall-clock time not yet consumed by fixed steps.
    accumulator: f32,
    last_substeps: u32,
    steps_total: u64,
}

impl SimWorld {
    /// Create a world with the given gravity and a static floor plane at y = 0.
    pub fn new(gravity: Vec3) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let floor = bodies.insert(RigidBodyBuilder::fixed().build());
        colliders.insert_with_parent(
            ColliderBuilder::halfspace(Vector::y_axis()).build(),
            floor,
            &mut bodies,
        );

        Self {
            gravity: vector![gravity.x, gravity.y, gravity.z],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            live: Vec::new(),
            accumulator: 0.0,
            last_substeps: 0,
            steps_total: 0,
        }
    }

    /// Create a dynamic unit-mass body and append it to the live list.
    /// Returns its insertion index.
    pub fn add_body(&mut self, shape: Shape, position: Vec3) -> usize {
        debug_assert!(!shape.is_degenerate(), "degenerate shape: {shape:?}");

        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .build();
        let handle = self.bodies.insert(body);

        let collider = match shape {
            Shape::Sphere { radius } => ColliderBuilder::ball(radius),
            Shape::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        }
        .mass(1.0)
        .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        let index = self.live.len();
        self.live.push(handle);
        tracing::debug!(index, ?shape, "body added");
        index
    }

    /// Remove every dynamic body. The floor stays; indices restart at zero.
    pub fn remove_all(&mut self) {
        for handle in self.live.drain(..) {
            self.bodies.remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
        tracing::debug!("all bodies removed");
    }

    /// Advance the simulation by up to `max_substeps` fixed steps of
    /// `fixed_dt`, consuming `wall_dt` of wall-clock time.
    ///
    /// Catch-up is best effort: backlog beyond one fixed step after the
    /// substep budget is spent is dropped, so a long stall does not burst
    /// into a catch-up storm later.
    pub fn step(&mut self, fixed_dt: f32, wall_dt: f32, max_substeps: u32) {
        self.accumulator += wall_dt;
        let mut substeps = 0;
        while self.accumulator >= fixed_dt && substeps < max_substeps {
            self.step_once(fixed_dt);
            self.accumulator -= fixed_dt;
            substeps += 1;
        }
        self.accumulator %= fixed_dt;
        self.last_substeps = substeps;
    }

    fn step_once(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        self.steps_total += 1;
    }

    /// Number of live dynamic bodies.
    pub fn body_count(&self) -> usize {
        self.live.len()
    }

    /// Pose of the body at `index`, if it exists.
    pub fn body_pose(&self, index: usize) -> Option<Pose> {
        let handle = *self.live.get(index)?;
        let body = self.bodies.get(handle)?;
        Some(read_pose(body))
    }

    /// Poses of all live bodies in insertion order.
    pub fn poses(&self) -> impl Iterator<Item = Pose> + '_ {
        self.live.iter().map(|h| read_pose(&self.bodies[*h]))
    }

    /// Fixed steps executed by the most recent `step` call.
    pub fn last_substeps(&self) -> u32 {
        self.last_substeps
    }

    /// Fixed steps executed since construction.
    pub fn steps_total(&self) -> u64 {
        self.steps_total
    }
}

fn read_pose(body: &RigidBody) -> Pose {
    let t = body.translation();
    let r = body.rotation();
    Pose {
        position: Vec3::new(t.x, t.y, t.z),
        rotation: Quat::from_xyzw(r.i, r.j, r.k, r.w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;
    const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

    #[test]
    fn bodies_get_sequential_indices() {
        let mut sim = SimWorld::new(GRAVITY);
        assert_eq!(sim.add_body(Shape::sphere(0.1), Vec3::new(0.0, 3.0, 0.0)), 0);
        assert_eq!(
            sim.add_body(Shape::cuboid(0.2, 0.2, 0.2), Vec3::new(1.0, 3.0, 0.0)),
            1
        );
        assert_eq!(sim.body_count(), 2);
    }

    #[test]
    fn reset_restarts_indices_at_zero() {
        let mut sim = SimWorld::new(GRAVITY);
        sim.add_body(Shape::sphere(0.1), Vec3::new(0.0, 3.0, 0.0));
        sim.add_body(Shape::sphere(0.1), Vec3::new(1.0, 3.0, 0.0));
        sim.remove_all();
        assert_eq!(sim.body_count(), 0);
        assert_eq!(sim.add_body(Shape::sphere(0.1), Vec3::new(0.0, 3.0, 0.0)), 0);
    }

    #[test]
    fn poses_only_change_through_step() {
        let mut sim = SimWorld::new(GRAVITY);
        let start = Vec3::new(0.5, 3.0, -0.5);
        sim.add_body(Shape::sphere(0.1), start);
        assert_eq!(sim.body_pose(0).unwrap().position, start);

        sim.step(DT, DT, 3);
        assert!(sim.body_pose(0).unwrap().position.y < start.y);
    }

    #[test]
    fn substeps_follow_wall_delta_and_budget() {
        let mut sim = SimWorld::new(GRAVITY);
        sim.step(DT, 2.5 * DT, 3);
        assert_eq!(sim.last_substeps(), 2);
        // Huge stall: budget caps the catch-up.
        sim.step(DT, 10.0, 3);
        assert_eq!(sim.last_substeps(), 3);
        // Backlog was dropped, not carried.
        sim.step(DT, 0.0, 3);
        assert_eq!(sim.last_substeps(), 0);
    }

    #[test]
    fn stepping_is_deterministic() {
        let run = || {
            let mut sim = SimWorld::new(GRAVITY);
            sim.add_body(Shape::sphere(0.15), Vec3::new(0.0, 3.0, 0.0));
            sim.add_body(Shape::cuboid(0.2, 0.3, 0.2), Vec3::new(0.3, 4.0, 0.1));
            for _ in 0..120 {
                sim.step(DT, DT, 3);
            }
            sim.poses().collect::<Vec<_>>()
        };
        let a = run();
        let b = run();
        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.position, pb.position);
            assert_eq!(pa.rotation, pb.rotation);
        }
    }

    #[test]
    fn dropped_sphere_settles_on_the_floor() {
        let radius = 0.2;
        let mut sim = SimWorld::new(GRAVITY);
        sim.add_body(Shape::sphere(radius), Vec3::new(0.0, 3.0, 0.0));

        // Four simulated seconds: fall (~0.75 s) plus settling.
        for _ in 0..240 {
            sim.step(DT, DT, 3);
        }

        let pose = sim.body_pose(0).unwrap();
        assert!(
            (pose.position.y - radius).abs() < 0.05,
            "resting height {} not near radius {radius}",
            pose.position.y
        );
        assert!(pose.position.x.abs() < 1e-3, "lateral drift in x");
        assert!(pose.position.z.abs() < 1e-3, "lateral drift in z");
    }
}
