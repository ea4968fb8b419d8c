use std::fmt::Write as _;
use std::time::{Duration, Instant};

use bigplane_mesh::GridMesh;
use glam::Mat4;

use crate::animation::Rotation;
use crate::backend::{FrameWindow, RenderBackend};
use crate::error::RenderError;
use crate::timing::{FpsSample, FrameTimer};

/// Everything that changes from one iteration of the loop to the next.
#[derive(Debug, Clone)]
pub struct LoopState {
    rotation: Rotation,
    timer: FrameTimer,
}

/// What one call to [`LoopState::advance`] produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    pub delta: Duration,
    pub sample: Option<FpsSample>,
    pub angle_degrees: f32,
    pub rotation: Mat4,
}

impl LoopState {
    pub fn new(now: Instant) -> Self {
        Self::with_rotation(now, Rotation::default())
    }

    pub fn with_rotation(now: Instant, rotation: Rotation) -> Self {
        Self {
            rotation,
            timer: FrameTimer::new(now),
        }
    }

    /// Advance the clock to `now`, then spin the rotation by the measured
    /// delta and derive this frame's matrix.
    pub fn advance(&mut self, now: Instant) -> FrameUpdate {
        let tick = self.timer.tick(now);
        self.rotation.advance(tick.delta_seconds());
        FrameUpdate {
            delta: tick.delta,
            sample: tick.sample,
            angle_degrees: self.rotation.angle_degrees(),
            rotation: self.rotation.matrix(),
        }
    }

    /// Count a finished frame toward the FPS window.
    pub fn frame_completed(&mut self) {
        self.timer.frame_rendered();
    }

    pub fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }
}

/// Totals for a finished [`RenderLoop::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub elapsed: Duration,
    pub angle_degrees: f32,
}

impl LoopSummary {
    pub fn average_fps(&self) -> f64 {
        if self.elapsed.is_zero() {
            return 0.0;
        }
        self.frames as f64 / self.elapsed.as_secs_f64()
    }
}

/// Drives the steady-state loop over a mesh that was uploaded once.
///
/// An iteration does no geometry work and no heap allocation: it advances the
/// clock, rebuilds the rotation matrix, and hands both to the backend with the
/// existing mesh handle.
pub struct RenderLoop<B: RenderBackend> {
    backend: B,
    mesh: B::Mesh,
    index_count: u32,
    state: LoopState,
    title: String,
    started: Instant,
    last_frame: Instant,
    frames: u64,
}

impl<B: RenderBackend> RenderLoop<B> {
    /// Upload `mesh` to `backend` and start the clock at `now`.
    pub fn new(backend: B, mesh: &GridMesh, now: Instant) -> Result<Self, RenderError> {
        Self::with_rotation(backend, mesh, now, Rotation::default())
    }

    pub fn with_rotation(
        mut backend: B,
        mesh: &GridMesh,
        now: Instant,
        rotation: Rotation,
    ) -> Result<Self, RenderError> {
        let _span = tracing::info_span!("upload_mesh").entered();
        let index_count =
            u32::try_from(mesh.index_count()).map_err(|_| RenderError::MeshTooLarge {
                bytes: mesh.index_bytes().len() as u64,
                limit: u64::from(u32::MAX) * 4,
            })?;

        let upload_start = Instant::now();
        let handle = backend.upload_mesh(mesh)?;
        tracing::info!(
            elapsed = ?upload_start.elapsed(),
            vertex_bytes = mesh.vertex_bytes().len(),
            index_bytes = mesh.index_bytes().len(),
            "mesh uploaded"
        );
        if index_count == 0 {
            tracing::warn!("mesh has no triangles; frames will only clear");
        }

        Ok(Self {
            backend,
            mesh: handle,
            index_count,
            state: LoopState::with_rotation(now, rotation),
            title: String::with_capacity(32),
            started: now,
            last_frame: now,
            frames: 0,
        })
    }

    /// Run one iteration at time `now`.
    pub fn frame<W: FrameWindow>(&mut self, window: &mut W, now: Instant) -> FrameUpdate {
        let update = self.state.advance(now);
        if let Some(sample) = update.sample {
            self.report(window, &sample);
        }

        self.backend.begin_frame();
        self.backend.set_rotation(&update.rotation);
        if self.index_count > 0 {
            self.backend.draw_indexed(self.mesh, self.index_count);
        }
        self.backend.present();
        window.poll_events();

        self.state.frame_completed();
        self.frames += 1;
        self.last_frame = now;
        update
    }

    /// Loop on the monotonic clock until the window asks to close.
    pub fn run<W: FrameWindow>(&mut self, window: &mut W) -> LoopSummary {
        self.run_with_clock(window, Instant::now)
    }

    /// Loop until the window asks to close, reading time from `clock`.
    pub fn run_with_clock<W, C>(&mut self, window: &mut W, mut clock: C) -> LoopSummary
    where
        W: FrameWindow,
        C: FnMut() -> Instant,
    {
        while !window.should_close() {
            self.frame(window, clock());
        }
        tracing::info!(frames = self.frames, "render loop stopped");
        self.summary()
    }

    pub fn summary(&self) -> LoopSummary {
        LoopSummary {
            frames: self.frames,
            elapsed: self.last_frame.saturating_duration_since(self.started),
            angle_degrees: self.state.rotation().angle_degrees(),
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    fn report<W: FrameWindow>(&mut self, window: &mut W, sample: &FpsSample) {
        self.title.clear();
        if write!(self.title, "FPS: {}", sample.frames).is_ok() {
            window.set_title(&self.title);
        }
        tracing::info!(fps = sample.frames, rate = sample.rate(), "frame rate");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, RecordingBackend, RecordingWindow};
    use bigplane_mesh::{GridConfig, generate_plane};
    use glam::Vec3;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn plane(n: u32) -> GridMesh {
        generate_plane(&GridConfig::with_size(n)).unwrap()
    }

    #[test]
    fn frame_issues_calls_in_order() {
        let t0 = Instant::now();
        let mesh = plane(4);
        let mut rl = RenderLoop::new(RecordingBackend::new(), &mesh, t0).unwrap();
        let mut window = RecordingWindow::closing_after(10);

        rl.frame(&mut window, t0 + ms(16));

        let calls = rl.backend().calls();
        assert_eq!(calls.len(), 5);
        assert!(matches!(calls[0], BackendCall::UploadMesh { .. }));
        assert_eq!(calls[1], BackendCall::BeginFrame);
        assert!(matches!(calls[2], BackendCall::SetRotation(_)));
        assert_eq!(
            calls[3],
            BackendCall::DrawIndexed {
                mesh: 0,
                index_count: 54
            }
        );
        assert_eq!(calls[4], BackendCall::Present);
        assert_eq!(window.polls(), 1);
    }

    #[test]
    fn mesh_uploaded_once() {
        let t0 = Instant::now();
        let mesh = plane(3);
        let mut rl = RenderLoop::new(RecordingBackend::new(), &mesh, t0).unwrap();
        let mut window = RecordingWindow::closing_after(50);
        for k in 1..=50 {
            rl.frame(&mut window, t0 + ms(k * 10));
        }
        let uploads = rl
            .backend()
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::UploadMesh { .. }))
            .count();
        assert_eq!(uploads, 1);
        assert_eq!(rl.backend().draw_count(), 50);
    }

    #[test]
    fn rotation_follows_wall_time() {
        let t0 = Instant::now();
        let mesh = plane(2);
        let mut rl = RenderLoop::new(RecordingBackend::counting(), &mesh, t0).unwrap();
        let mut window = RecordingWindow::closing_after(u64::MAX);

        let update = rl.frame(&mut window, t0 + ms(500));
        assert!((update.angle_degrees - 45.0).abs() < 1e-3);

        let update = rl.frame(&mut window, t0 + ms(1000));
        assert!((update.angle_degrees - 90.0).abs() < 1e-3);
        let p = update.rotation.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn fps_title_once_per_window() {
        let t0 = Instant::now();
        let mesh = plane(2);
        let mut rl = RenderLoop::new(RecordingBackend::counting(), &mesh, t0).unwrap();
        let mut window = RecordingWindow::closing_after(u64::MAX);

        // 30 frames inside the first second
        for k in 0..30 {
            rl.frame(&mut window, t0 + ms(k * 33));
        }
        assert!(window.titles().is_empty());
        assert_eq!(rl.state().timer().frame_count(), 30);

        let update = rl.frame(&mut window, t0 + ms(1000));
        assert_eq!(update.sample.map(|s| s.frames), Some(30));
        assert_eq!(window.titles(), ["FPS: 30"]);
        // the reporting frame itself counts toward the next window
        assert_eq!(rl.state().timer().frame_count(), 1);

        // a shorter figure overwrites the previous title rather than appending
        for k in 1..5 {
            rl.frame(&mut window, t0 + ms(1000 + k * 200));
        }
        rl.frame(&mut window, t0 + ms(2000));
        assert_eq!(window.titles(), ["FPS: 30", "FPS: 5"]);
    }

    #[test]
    fn run_stops_when_window_closes() {
        let t0 = Instant::now();
        let mesh = plane(5);
        let mut rl = RenderLoop::new(RecordingBackend::counting(), &mesh, t0).unwrap();
        let mut window = RecordingWindow::closing_after(120);

        let mut now = t0;
        let summary = rl.run_with_clock(&mut window, || {
            now += ms(25);
            now
        });

        assert_eq!(summary.frames, 120);
        assert_eq!(summary.elapsed, ms(3000));
        assert!((summary.average_fps() - 40.0).abs() < 1e-9);
        // 3 s at 90 deg/s
        assert!((summary.angle_degrees - 270.0).abs() < 1e-2);
        assert_eq!(rl.backend().frames_presented(), 120);
        assert_eq!(window.titles(), ["FPS: 39", "FPS: 40", "FPS: 40"]);
    }

    #[test]
    fn empty_mesh_never_draws() {
        let t0 = Instant::now();
        let mesh = plane(1);
        let mut rl = RenderLoop::new(RecordingBackend::new(), &mesh, t0).unwrap();
        assert_eq!(rl.index_count(), 0);

        let mut window = RecordingWindow::closing_after(5);
        let mut now = t0;
        let summary = rl.run_with_clock(&mut window, || {
            now += ms(16);
            now
        });

        assert_eq!(summary.frames, 5);
        assert_eq!(rl.backend().draw_count(), 0);
        assert_eq!(rl.backend().frames_presented(), 5);
    }

    #[test]
    fn closed_window_runs_no_frames() {
        let t0 = Instant::now();
        let mesh = plane(2);
        let mut rl = RenderLoop::new(RecordingBackend::new(), &mesh, t0).unwrap();
        let mut window = RecordingWindow::closing_after(0);
        let summary = rl.run(&mut window);
        assert_eq!(summary.frames, 0);
        assert_eq!(rl.backend().calls().len(), 1);
    }

    #[test]
    fn upload_failure_surfaces() {
        let mesh = plane(16);
        let backend = RecordingBackend::new().with_buffer_limit(128);
        let result = RenderLoop::new(backend, &mesh, Instant::now());
        assert!(matches!(result, Err(RenderError::MeshTooLarge { .. })));
    }

    #[test]
    fn loop_state_matrix_is_rebuilt_not_accumulated() {
        let t0 = Instant::now();
        let mut state = LoopState::new(t0);
        let mut now = t0;
        // many quarter turns; a composed matrix would drift, a rebuilt one cannot
        for _ in 0..10_000 {
            now += ms(1000);
            state.advance(now);
        }
        let update = state.advance(now);
        assert_eq!(update.delta, Duration::ZERO);
        assert_eq!(update.angle_degrees, 0.0);
        assert_eq!(update.rotation, Mat4::IDENTITY);
    }
}
