use bigplane_mesh::GridMesh;
use glam::Mat4;

use crate::error::RenderError;

/// Rendering backend contract. All backends implement this trait.
///
/// Geometry is uploaded once and referred to by an opaque handle afterwards.
/// A frame is `begin_frame`, `set_rotation`, zero or one `draw_indexed`, then
/// `present`. Per-frame methods are infallible: surface loss and similar
/// conditions are the backend's to recover from.
pub trait RenderBackend {
    /// Handle to geometry stored on the backend.
    type Mesh: Copy;

    /// Upload the vertex and index buffers of `mesh`.
    fn upload_mesh(&mut self, mesh: &GridMesh) -> Result<Self::Mesh, RenderError>;

    /// Start a frame and clear the target.
    fn begin_frame(&mut self);

    /// Set the rotation uniform used by subsequent draws.
    fn set_rotation(&mut self, rotation: &Mat4);

    /// Draw `index_count` indices of `mesh` as a triangle list.
    fn draw_indexed(&mut self, mesh: Self::Mesh, index_count: u32);

    /// Finish the frame and swap it onto the screen.
    fn present(&mut self);
}

/// The window the loop renders into.
pub trait FrameWindow {
    /// Close was requested; checked at the top of every iteration.
    fn should_close(&self) -> bool;

    /// Pump pending window events.
    fn poll_events(&mut self);

    fn set_title(&mut self, title: &str);
}

/// A call observed by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    UploadMesh {
        vertex_bytes: usize,
        index_bytes: usize,
    },
    BeginFrame,
    SetRotation(Mat4),
    DrawIndexed {
        mesh: u32,
        index_count: u32,
    },
    Present,
}

/// Backend that records calls instead of rendering.
///
/// Useful for tests and for running the loop headless.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    uploads: u32,
    buffer_limit: Option<u64>,
    record_frames: bool,
    frames_presented: u64,
}

impl RecordingBackend {
    /// Record every call, including per-frame ones.
    pub fn new() -> Self {
        Self {
            record_frames: true,
            ..Self::default()
        }
    }

    /// Record uploads only and count presented frames. Keeps long headless
    /// runs from growing the call log.
    pub fn counting() -> Self {
        Self::default()
    }

    /// Reject uploads whose vertex or index buffer exceeds `limit` bytes.
    pub fn with_buffer_limit(mut self, limit: u64) -> Self {
        self.buffer_limit = Some(limit);
        self
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Number of recorded draw calls.
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::DrawIndexed { .. }))
            .count()
    }

    fn record(&mut self, call: BackendCall) {
        if self.record_frames {
            self.calls.push(call);
        }
    }
}

impl RenderBackend for RecordingBackend {
    type Mesh = u32;

    fn upload_mesh(&mut self, mesh: &GridMesh) -> Result<u32, RenderError> {
        let vertex_bytes = mesh.vertex_bytes().len();
        let index_bytes = mesh.index_bytes().len();
        if let Some(limit) = self.buffer_limit {
            let largest = vertex_bytes.max(index_bytes) as u64;
            if largest > limit {
                return Err(RenderError::MeshTooLarge {
                    bytes: largest,
                    limit,
                });
            }
        }
        self.calls.push(BackendCall::UploadMesh {
            vertex_bytes,
            index_bytes,
        });
        self.uploads += 1;
        Ok(self.uploads - 1)
    }

    fn begin_frame(&mut self) {
        self.record(BackendCall::BeginFrame);
    }

    fn set_rotation(&mut self, rotation: &Mat4) {
        self.record(BackendCall::SetRotation(*rotation));
    }

    fn draw_indexed(&mut self, mesh: u32, index_count: u32) {
        self.record(BackendCall::DrawIndexed { mesh, index_count });
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        self.record(BackendCall::Present);
    }
}

/// Window that asks to close after a fixed number of event polls.
#[derive(Debug, Default)]
pub struct RecordingWindow {
    close_after: u64,
    polls: u64,
    titles: Vec<String>,
}

impl RecordingWindow {
    pub fn closing_after(frames: u64) -> Self {
        Self {
            close_after: frames,
            ..Self::default()
        }
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Every title that was set, oldest first.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }
}

impl FrameWindow for RecordingWindow {
    fn should_close(&self) -> bool {
        self.polls >= self.close_after
    }

    fn poll_events(&mut self) {
        self.polls += 1;
    }

    fn set_title(&mut self, title: &str) {
        self.titles.push(title.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigplane_mesh::{GridConfig, generate_plane};

    #[test]
    fn recording_backend_logs_upload() {
        let mesh = generate_plane(&GridConfig::with_size(3)).unwrap();
        let mut backend = RecordingBackend::new();
        let handle = backend.upload_mesh(&mesh).unwrap();

        assert_eq!(handle, 0);
        assert_eq!(
            backend.calls(),
            [BackendCall::UploadMesh {
                vertex_bytes: 9 * 3 * 4,
                index_bytes: 4 * 6 * 4,
            }]
        );
    }

    #[test]
    fn buffer_limit_rejects_large_meshes() {
        let mesh = generate_plane(&GridConfig::with_size(10)).unwrap();
        let mut backend = RecordingBackend::new().with_buffer_limit(64);
        let err = backend.upload_mesh(&mesh).unwrap_err();
        assert!(matches!(err, RenderError::MeshTooLarge { limit: 64, .. }));
        assert!(err.is_fatal());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn counting_backend_skips_frame_calls() {
        let mut backend = RecordingBackend::counting();
        backend.begin_frame();
        backend.set_rotation(&Mat4::IDENTITY);
        backend.draw_indexed(0, 6);
        backend.present();
        assert!(backend.calls().is_empty());
        assert_eq!(backend.frames_presented(), 1);
    }

    #[test]
    fn window_closes_after_polls() {
        let mut window = RecordingWindow::closing_after(2);
        assert!(!window.should_close());
        window.poll_events();
        window.poll_events();
        assert!(window.should_close());
        window.set_title("FPS: 1");
        assert_eq!(window.titles(), ["FPS: 1"]);
    }

    #[test]
    fn shader_errors_are_not_fatal() {
        assert!(!RenderError::ShaderCompile("bad".into()).is_fatal());
        assert!(!RenderError::ShaderLink("bad".into()).is_fatal());
        assert!(RenderError::Initialization("no adapter".into()).is_fatal());
    }
}
