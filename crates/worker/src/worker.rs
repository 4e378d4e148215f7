use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use glam::Vec3;
use tumble_engine::SimWorld;
use tumble_protocol::{Command, FrameUpdate};
use tumble_common::Shape;

/// Configuration for a physics worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Nominal stepping period (60 Hz by default).
    pub period: Duration,
    /// Time scale applied to both the fixed and wall deltas. 1.0 is real
    /// time; smaller values give slow motion.
    pub time_scale: f32,
    /// Catch-up budget per tick.
    pub max_substeps: u32,
    pub gravity: Vec3,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_micros(16_667),
            time_scale: 1.0,
            max_substeps: 3,
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

/// Errors from starting a worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to spawn physics thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to a running physics worker thread.
///
/// The thread exits when the command `Sender` returned by [`spawn`] (and all
/// of its clones) has been dropped; [`join`] then reaps it. Joining while a
/// sender is still alive blocks until that sender is dropped.
///
/// [`spawn`]: PhysicsWorker::spawn
/// [`join`]: PhysicsWorker::join
pub struct PhysicsWorker {
    thread: Option<JoinHandle<()>>,
}

impl PhysicsWorker {
    /// Start a worker thread and return its handle plus the two channel
    /// endpoints the render side keeps: the command sender and the frame
    /// receiver.
    pub fn spawn(
        config: WorkerConfig,
    ) -> Result<(Self, Sender<Command>, Receiver<FrameUpdate>), WorkerError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (frame_tx, frame_rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("tumble-physics".into())
            .spawn(move || run(config, command_rx, frame_tx))?;
        Ok((
            Self {
                thread: Some(thread),
            },
            command_tx,
            frame_rx,
        ))
    }

    /// Wait for the worker thread to exit.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// The worker loop: wait on the command channel until the next step deadline,
/// servicing commands as they arrive; at the deadline, step with the measured
/// wall delta and reschedule from the previous deadline.
fn run(config: WorkerConfig, commands: Receiver<Command>, frames: Sender<FrameUpdate>) {
    let mut sim = SimWorld::new(config.gravity);
    let fixed_dt = config.period.as_secs_f32() * config.time_scale;

    let mut next_deadline = Instant::now() + config.period;
    let mut last_tick = Instant::now();

    tracing::info!(period_us = config.period.as_micros() as u64, "physics worker started");

    loop {
        let now = Instant::now();
        if now >= next_deadline {
            let wall_dt = (now - last_tick).as_secs_f32() * config.time_scale;
            last_tick = now;
            sim.step(fixed_dt, wall_dt, config.max_substeps);
            // Schedule from the previous deadline so jitter does not
            // accumulate; never into the past, so an overloaded worker runs
            // ticks back-to-back instead of spiralling.
            next_deadline = std::cmp::max(next_deadline + config.period, now);
            continue;
        }

        match commands.recv_timeout(next_deadline - now) {
            Ok(command) => handle_command(&mut sim, command, &frames),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!(steps = sim.steps_total(), "physics worker stopped");
}

fn handle_command(sim: &mut SimWorld, command: Command, frames: &Sender<FrameUpdate>) {
    match command {
        Command::AddSphere { position, radius } => {
            let index = sim.add_body(Shape::sphere(radius), position);
            tracing::debug!(index, radius, "sphere added");
        }
        Command::AddBox {
            position,
            width,
            height,
            depth,
        } => {
            let index = sim.add_body(Shape::cuboid(width, height, depth), position);
            tracing::debug!(index, "box added");
        }
        Command::Reset => {
            sim.remove_all();
            tracing::debug!("simulation reset");
        }
        Command::RequestFrame { mut buffers } => {
            let live = sim.body_count();
            if live > buffers.capacity() {
                tracing::warn!(
                    live,
                    capacity = buffers.capacity(),
                    "live bodies exceed buffer capacity; clamping frame"
                );
            }
            let count = buffers.fill(sim.poses());
            if frames.send(FrameUpdate { count, buffers }).is_err() {
                // Render side hung up mid-flight; the reply is moot.
                tracing::debug!("frame reply dropped: render side disconnected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumble_common::Pose;
    use tumble_protocol::FrameBuffers;

    fn request(
        commands: &Sender<Command>,
        frames: &Receiver<FrameUpdate>,
        buffers: FrameBuffers,
    ) -> FrameUpdate {
        commands
            .send(Command::RequestFrame { buffers })
            .expect("worker alive");
        frames
            .recv_timeout(Duration::from_secs(5))
            .expect("frame reply")
    }

    #[test]
    fn empty_world_replies_count_zero_with_buffers_untouched() {
        let (worker, commands, frames) = PhysicsWorker::spawn(WorkerConfig::default()).unwrap();

        let mut buffers = FrameBuffers::new(4);
        let sentinel = Pose::at(Vec3::splat(42.0));
        buffers.write_pose(0, &sentinel).unwrap();

        let update = request(&commands, &frames, buffers);
        assert_eq!(update.count, 0);
        assert_eq!(update.buffers.pose(0).unwrap().position, Vec3::splat(42.0));

        drop(commands);
        worker.join();
    }

    #[test]
    fn reply_returns_the_same_allocation() {
        let (worker, commands, frames) = PhysicsWorker::spawn(WorkerConfig::default()).unwrap();

        let update = request(&commands, &frames, FrameBuffers::new(7));
        assert_eq!(update.buffers.capacity(), 7);

        drop(commands);
        worker.join();
    }

    #[test]
    fn spawned_sphere_shows_up_and_falls() {
        let (worker, commands, frames) = PhysicsWorker::spawn(WorkerConfig::default()).unwrap();

        commands
            .send(Command::AddSphere {
                position: Vec3::new(0.0, 3.0, 0.0),
                radius: 0.1,
            })
            .unwrap();

        // Ping-pong frames until the sphere has visibly fallen.
        let mut buffers = FrameBuffers::new(4);
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut fell = false;
        while Instant::now() < deadline {
            let update = request(&commands, &frames, buffers);
            buffers = update.buffers;
            if update.count == 1 && buffers.pose(0).unwrap().position.y < 2.9 {
                fell = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(fell, "sphere never fell below its spawn height");

        drop(commands);
        worker.join();
    }

    #[test]
    fn reset_then_spawn_reuses_index_zero() {
        let (worker, commands, frames) = PhysicsWorker::spawn(WorkerConfig::default()).unwrap();

        commands
            .send(Command::AddSphere {
                position: Vec3::new(1.0, 3.0, 0.0),
                radius: 0.1,
            })
            .unwrap();
        commands
            .send(Command::AddSphere {
                position: Vec3::new(2.0, 3.0, 0.0),
                radius: 0.1,
            })
            .unwrap();
        commands.send(Command::Reset).unwrap();
        commands
            .send(Command::AddBox {
                position: Vec3::new(7.0, 3.0, 0.0),
                width: 0.2,
                height: 0.2,
                depth: 0.2,
            })
            .unwrap();

        // Channel order guarantees the frame reflects everything above.
        let update = request(&commands, &frames, FrameBuffers::new(4));
        assert_eq!(update.count, 1);
        let pose = update.buffers.pose(0).unwrap();
        assert!((pose.position.x - 7.0).abs() < 0.5);

        drop(commands);
        worker.join();
    }

    #[test]
    fn capacity_overflow_clamps_count() {
        let (worker, commands, frames) = PhysicsWorker::spawn(WorkerConfig::default()).unwrap();

        for i in 0..3 {
            commands
                .send(Command::AddSphere {
                    position: Vec3::new(i as f32, 3.0, 0.0),
                    radius: 0.1,
                })
                .unwrap();
        }

        let update = request(&commands, &frames, FrameBuffers::new(2));
        assert_eq!(update.count, 2);

        drop(commands);
        worker.join();
    }
}
