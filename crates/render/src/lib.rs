//! Rendering adapter: backend-agnostic draw loop for an uploaded plane.
//!
//! # Invariants
//! - Geometry is uploaded once; frames only refer to it by handle.
//! - The rotation matrix is derived from the wrapped angle every frame,
//!   never composed from the previous frame's matrix.
//! - Loop state lives in an explicit [`LoopState`] owned by the
//!   [`RenderLoop`]; nothing else mutates it.
//!
//! A [`RecordingBackend`] stands in for the GPU in tests and headless runs.
//! The trait is stable; the wgpu backend implements it without changing
//! consumers.

mod animation;
mod backend;
mod error;
mod render_loop;
mod timing;

pub use animation::{DEGREES_PER_SECOND, Rotation};
pub use backend::{BackendCall, FrameWindow, RecordingBackend, RecordingWindow, RenderBackend};
pub use error::RenderError;
pub use render_loop::{FrameUpdate, LoopState, LoopSummary, RenderLoop};
pub use timing::{FPS_WINDOW, FpsSample, FrameTick, FrameTimer};

pub fn crate_info() -> &'static str {
    "bigplane-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
