//! Plane mesh generation: a regular N×N grid written into flat buffers.
//!
//! # Invariants
//! - Vertex buffer holds `N² × 3` floats, row-major (`vertex = gy * N + gx`).
//! - Index buffer holds `(N-1)² × 6` indices, two triangles per cell.
//! - Output is a pure function of the [`GridConfig`]; the buffers are fully
//!   written before they are returned.
//!
//! Buffers are reserved once and filled in place (see [`filled_buffer`]), so
//! generating hundreds of millions of elements never pays for a zero fill.

mod buffer;
mod error;
mod export;
mod grid;

pub use buffer::{FillStrategy, filled_buffer};
pub use error::MeshError;
pub use export::{export_obj, write_obj};
pub use grid::{
    DEFAULT_GRID_SIZE, GridConfig, GridMesh, MAX_GRID_SIZE, MeshStats, PlaneBounds, generate_plane,
};

pub fn crate_info() -> &'static str {
    "bigplane-mesh v0.1.0"
}
