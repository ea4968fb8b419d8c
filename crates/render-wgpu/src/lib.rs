//! wgpu render backend for the plane.
//!
//! Uploads the grid once into a vertex and a `u32` index buffer, then draws it
//! every frame with a single rotation uniform.
//!
//! # Invariants
//! - Mesh buffers are immutable after upload.
//! - Per-frame work is one uniform write and one indexed draw.
//! - Shader problems are logged and kept as diagnostics; they never abort.

mod gpu;
mod shaders;

pub use gpu::{BackendOptions, MeshId, WgpuBackend};
pub use shaders::PLANE_SHADER;
