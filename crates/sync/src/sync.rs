use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use glam::Vec3;
use tumble_common::{Pose, Visual};
use tumble_protocol::{Command, FrameBuffers, FrameUpdate};

use crate::action::Action;
use crate::rng::SpawnRng;
use crate::scene::Scene;

// Spawn parameter ranges.
const RADIUS_MIN: f32 = 0.05;
const RADIUS_MAX: f32 = 0.20;
const BOX_DIM_MIN: f32 = 0.05;
const BOX_DIM_MAX: f32 = 0.35;
const SPAWN_EXTENT: f32 = 2.0;
const SPAWN_HEIGHT: f32 = 3.0;

/// Render-thread side of the protocol.
///
/// Owns the renderable count, the pending-frame flag, and, between
/// exchanges, the transfer buffer pair. Spawn and reset commands are
/// best-effort: nothing is awaited and nothing is rolled back if the worker
/// side fails.
pub struct Synchronizer {
    commands: Sender<Command>,
    frames: Receiver<FrameUpdate>,
    /// Buffer pair while this side owns it; `None` while on loan to the
    /// worker.
    buffers: Option<FrameBuffers>,
    /// True between "request sent" and "reply applied".
    pending: bool,
    renderable_count: usize,
    rng: SpawnRng,
}

impl Synchronizer {
    pub fn new(
        commands: Sender<Command>,
        frames: Receiver<FrameUpdate>,
        capacity: usize,
        seed: u64,
    ) -> Self {
        Self {
            commands,
            frames,
            buffers: Some(FrameBuffers::new(capacity)),
            pending: false,
            renderable_count: 0,
            rng: SpawnRng::new(seed),
        }
    }

    /// Number of renderables this side has created since the last reset.
    pub fn renderable_count(&self) -> usize {
        self.renderable_count
    }

    /// Whether a frame request is currently in flight.
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Create a sphere renderable with randomized size and drop position,
    /// and tell the worker to create the matching body.
    pub fn spawn_sphere(&mut self, scene: &mut dyn Scene) {
        let radius = self.rng.range(RADIUS_MIN, RADIUS_MAX);
        let position = self.spawn_position();
        scene.add_object(Visual::Sphere { radius }, Pose::at(position));
        self.renderable_count += 1;
        self.send(Command::AddSphere { position, radius });
    }

    /// Create a box renderable with randomized dimensions and drop position,
    /// and tell the worker to create the matching body.
    pub fn spawn_box(&mut self, scene: &mut dyn Scene) {
        let width = self.rng.range(BOX_DIM_MIN, BOX_DIM_MAX);
        let height = self.rng.range(BOX_DIM_MIN, BOX_DIM_MAX);
        let depth = self.rng.range(BOX_DIM_MIN, BOX_DIM_MAX);
        let position = self.spawn_position();
        scene.add_object(
            Visual::Box {
                width,
                height,
                depth,
            },
            Pose::at(position),
        );
        self.renderable_count += 1;
        self.send(Command::AddBox {
            position,
            width,
            height,
            depth,
        });
    }

    /// Clear all renderables and ask the worker to clear simulation state.
    /// The two clears are not transactional; a frame already in flight may
    /// still carry the old bodies and is applied to nothing.
    pub fn reset(&mut self, scene: &mut dyn Scene) {
        scene.clear();
        self.renderable_count = 0;
        self.send(Command::Reset);
    }

    /// Route an input-source action to the matching entry point.
    pub fn apply(&mut self, action: Action, scene: &mut dyn Scene) {
        match action {
            Action::SpawnSphere => self.spawn_sphere(scene),
            Action::SpawnBox => self.spawn_box(scene),
            Action::SpawnBoxBurst(n) => {
                for _ in 0..n {
                    self.spawn_box(scene);
                }
            }
            Action::Reset => self.reset(scene),
        }
    }

    /// Per-render-frame exchange. Applies at most one pending reply to the
    /// scene, then immediately issues the next request with the returned
    /// buffers. Never blocks: with no reply waiting, the scene keeps its
    /// last-known poses.
    pub fn sync(&mut self, scene: &mut dyn Scene) {
        if self.pending {
            match self.frames.try_recv() {
                Ok(update) => {
                    // Extra renderables past the received count were spawned
                    // after the worker filled this frame; leave them at their
                    // spawn pose until the next exchange.
                    let applied = update.count.min(self.renderable_count);
                    for index in 0..applied {
                        if let Some(pose) = update.buffers.pose(index) {
                            scene.set_pose(index, pose);
                        }
                    }
                    self.buffers = Some(update.buffers);
                    self.pending = false;
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        if let Some(buffers) = self.buffers.take() {
            match self.commands.send(Command::RequestFrame { buffers }) {
                Ok(()) => self.pending = true,
                // Worker gone; reclaim the pair so a later worker could
                // take over the session.
                Err(err) => {
                    if let Command::RequestFrame { buffers } = err.0 {
                        self.buffers = Some(buffers);
                    }
                }
            }
        }
    }

    fn spawn_position(&mut self) -> Vec3 {
        Vec3::new(
            self.rng.range(-SPAWN_EXTENT, SPAWN_EXTENT),
            SPAWN_HEIGHT,
            self.rng.range(-SPAWN_EXTENT, SPAWN_EXTENT),
        )
    }

    fn send(&mut self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("command dropped: physics worker disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::TextScene;
    use glam::Quat;
    use std::sync::mpsc;

    fn harness() -> (
        Synchronizer,
        mpsc::Receiver<Command>,
        mpsc::Sender<FrameUpdate>,
    ) {
        let (command_tx, command_rx) = mpsc::channel();
        let (frame_tx, frame_rx) = mpsc::channel();
        (
            Synchronizer::new(command_tx, frame_rx, 16, 42),
            command_rx,
            frame_tx,
        )
    }

    fn drain_requests(commands: &mpsc::Receiver<Command>) -> Vec<FrameBuffers> {
        commands
            .try_iter()
            .filter_map(|c| match c {
                Command::RequestFrame { buffers } => Some(buffers),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn at_most_one_request_in_flight() {
        let (mut sync, commands, _frame_tx) = harness();
        let mut scene = TextScene::new();

        // A slow worker never replies; rapid render frames must not stack
        // up requests.
        for _ in 0..50 {
            sync.sync(&mut scene);
        }
        let requests = drain_requests(&commands);
        assert_eq!(requests.len(), 1);
        assert!(sync.pending());
    }

    #[test]
    fn reply_is_applied_and_buffers_are_recycled() {
        let (mut sync, commands, frame_tx) = harness();
        let mut scene = TextScene::new();

        sync.spawn_sphere(&mut scene);
        sync.sync(&mut scene);
        let mut buffers = drain_requests(&commands).pop().expect("first request");

        let settled = Pose {
            position: Vec3::new(0.5, 0.1, -0.5),
            rotation: Quat::from_xyzw(0.0, 0.0, 1.0, 0.0),
        };
        buffers.write_pose(0, &settled).unwrap();
        frame_tx.send(FrameUpdate { count: 1, buffers }).unwrap();

        sync.sync(&mut scene);
        assert_eq!(scene.objects()[0].1.position, settled.position);
        assert_eq!(scene.objects()[0].1.rotation, settled.rotation);

        // The same allocation went straight back out as the next request.
        let recycled = drain_requests(&commands).pop().expect("second request");
        assert_eq!(recycled.capacity(), 16);
        assert!(sync.pending());
    }

    #[test]
    fn renderables_beyond_received_count_keep_their_pose() {
        let (mut sync, commands, frame_tx) = harness();
        let mut scene = TextScene::new();

        sync.spawn_sphere(&mut scene);
        sync.sync(&mut scene);
        let mut buffers = drain_requests(&commands).pop().unwrap();

        // Second spawn lands while the frame is in flight.
        sync.spawn_box(&mut scene);
        let late_spawn_pose = scene.objects()[1].1;

        buffers.write_pose(0, &Pose::at(Vec3::new(0.0, 0.1, 0.0))).unwrap();
        frame_tx.send(FrameUpdate { count: 1, buffers }).unwrap();
        sync.sync(&mut scene);

        assert_eq!(scene.objects()[0].1.position.y, 0.1);
        assert_eq!(scene.objects()[1].1, late_spawn_pose);
    }

    #[test]
    fn received_count_beyond_renderables_is_ignored() {
        let (mut sync, commands, frame_tx) = harness();
        let mut scene = TextScene::new();

        sync.spawn_sphere(&mut scene);
        sync.sync(&mut scene);
        let mut buffers = drain_requests(&commands).pop().unwrap();

        // Worker claims three bodies; render side only knows about one.
        for i in 0..3 {
            buffers
                .write_pose(i, &Pose::at(Vec3::new(i as f32, 0.0, 0.0)))
                .unwrap();
        }
        frame_tx.send(FrameUpdate { count: 3, buffers }).unwrap();
        sync.sync(&mut scene);

        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn spawn_commands_match_scene_visuals() {
        let (mut sync, commands, _frame_tx) = harness();
        let mut scene = TextScene::new();

        sync.spawn_sphere(&mut scene);
        sync.spawn_box(&mut scene);

        let sent: Vec<Command> = commands.try_iter().collect();
        assert_eq!(sent.len(), 2);

        match (&sent[0], &scene.objects()[0].0) {
            (Command::AddSphere { radius, position }, Visual::Sphere { radius: r }) => {
                assert_eq!(radius, r);
                assert!((RADIUS_MIN..RADIUS_MAX).contains(radius));
                assert_eq!(position.y, SPAWN_HEIGHT);
                assert!((-SPAWN_EXTENT..SPAWN_EXTENT).contains(&position.x));
                assert!((-SPAWN_EXTENT..SPAWN_EXTENT).contains(&position.z));
            }
            other => panic!("mismatched spawn: {other:?}"),
        }
        match (&sent[1], &scene.objects()[1].0) {
            (
                Command::AddBox { width, height, depth, .. },
                Visual::Box {
                    width: w,
                    height: h,
                    depth: d,
                },
            ) => {
                assert_eq!((width, height, depth), (w, h, d));
                for dim in [*width, *height, *depth] {
                    assert!((BOX_DIM_MIN..BOX_DIM_MAX).contains(&dim));
                }
            }
            other => panic!("mismatched spawn: {other:?}"),
        }
    }

    #[test]
    fn reset_clears_scene_and_count() {
        let (mut sync, commands, _frame_tx) = harness();
        let mut scene = TextScene::new();

        sync.spawn_sphere(&mut scene);
        sync.spawn_box(&mut scene);
        sync.reset(&mut scene);

        assert!(scene.is_empty());
        assert_eq!(sync.renderable_count(), 0);
        let sent: Vec<Command> = commands.try_iter().collect();
        assert!(matches!(sent.last(), Some(Command::Reset)));
    }

    #[test]
    fn burst_action_spawns_n_boxes() {
        let (mut sync, commands, _frame_tx) = harness();
        let mut scene = TextScene::new();

        sync.apply(Action::SpawnBoxBurst(10), &mut scene);
        assert_eq!(scene.len(), 10);
        assert_eq!(commands.try_iter().count(), 10);
    }

    #[test]
    fn same_seed_spawns_identically() {
        let run = |seed| {
            let (command_tx, _command_rx) = mpsc::channel();
            let (_frame_tx, frame_rx) = mpsc::channel();
            let mut sync = Synchronizer::new(command_tx, frame_rx, 16, seed);
            let mut scene = TextScene::new();
            for _ in 0..5 {
                sync.spawn_sphere(&mut scene);
                sync.spawn_box(&mut scene);
            }
            scene
                .objects()
                .iter()
                .map(|(v, p)| (*v, p.position))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9), run(10));
    }

    #[test]
    fn worker_disconnect_returns_the_buffers() {
        let (command_tx, command_rx) = mpsc::channel();
        let (_frame_tx, frame_rx) = mpsc::channel();
        let mut sync = Synchronizer::new(command_tx, frame_rx, 16, 1);
        let mut scene = TextScene::new();
        drop(command_rx);

        sync.sync(&mut scene);
        assert!(!sync.pending());
        // A later sync can still try: the pair was reclaimed, not lost.
        sync.sync(&mut scene);
        assert!(!sync.pending());
    }
}
