use std::time::Instant;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::buffer::{FillStrategy, filled_buffer};
use crate::error::MeshError;

/// Grid dimension giving roughly 100 million triangles.
pub const DEFAULT_GRID_SIZE: u32 = 7271;

/// Largest grid whose vertex indices still fit in `u32`.
pub const MAX_GRID_SIZE: u32 = 65_536;

const MIB: usize = 1024 * 1024;

/// Axis-aligned rectangle in normalized device coordinates that the grid is
/// stretched over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl PlaneBounds {
    /// The `[-1, 1]²` NDC square shrunk by `margin` on every side.
    pub fn inset_ndc(margin: f32) -> Self {
        Self {
            min: Vec2::splat(-1.0 + margin),
            max: Vec2::splat(1.0 - margin),
        }
    }
}

/// Inputs to [`generate_plane`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Vertices per side (N).
    pub grid_size: u32,
    /// Inset from the NDC edge on every side.
    pub margin: f32,
    /// Constant z of every vertex.
    pub depth: f32,
    #[serde(skip)]
    pub fill: FillStrategy,
    /// Host bytes the vertex and index buffers may take together.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_budget: Option<u64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            margin: 0.1,
            depth: 0.0,
            fill: FillStrategy::default(),
            memory_budget: None,
        }
    }
}

impl GridConfig {
    pub fn with_size(grid_size: u32) -> Self {
        Self {
            grid_size,
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> PlaneBounds {
        PlaneBounds::inset_ndc(self.margin)
    }

    /// Reject configurations that would produce degenerate or unaddressable
    /// geometry. Run this before generating.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.grid_size < 2 {
            return Err(MeshError::InvalidConfiguration(format!(
                "grid size must be at least 2, got {}",
                self.grid_size
            )));
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(MeshError::InvalidConfiguration(format!(
                "grid size {} exceeds the u32 index range (max {MAX_GRID_SIZE})",
                self.grid_size
            )));
        }
        self.check_geometry()
    }

    /// Margin and depth checks shared with [`generate_plane`], which still
    /// accepts `N = 1`.
    fn check_geometry(&self) -> Result<(), MeshError> {
        if !(0.0..1.0).contains(&self.margin) {
            return Err(MeshError::InvalidConfiguration(format!(
                "margin must lie in [0, 1), got {}",
                self.margin
            )));
        }
        if !self.depth.is_finite() {
            return Err(MeshError::InvalidConfiguration(
                "depth must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Stats the mesh for this config will have, without generating it.
    pub fn expected_stats(&self) -> MeshStats {
        let n = self.grid_size as u64;
        let cells = n.saturating_sub(1).pow(2);
        MeshStats::from_counts(n * n, cells * 6)
    }
}

/// Sizes of a generated mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub vertices: u64,
    pub indices: u64,
    pub triangles: u64,
    pub vertex_bytes: u64,
    pub index_bytes: u64,
}

impl MeshStats {
    fn from_counts(vertices: u64, indices: u64) -> Self {
        Self {
            vertices,
            indices,
            triangles: indices / 3,
            vertex_bytes: vertices * 3 * std::mem::size_of::<f32>() as u64,
            index_bytes: indices * std::mem::size_of::<u32>() as u64,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.vertex_bytes + self.index_bytes
    }
}

/// A generated grid plane: flat positions (3 floats per vertex) and flat
/// triangle indices (3 per triangle).
#[derive(Debug, Clone, PartialEq)]
pub struct GridMesh {
    grid_size: u32,
    vertices: Vec<f32>,
    indices: Vec<u32>,
}

impl GridMesh {
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Flat `x, y, z` floats.
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Position of vertex `i`.
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.vertices[i * 3..i * 3 + 3])
    }

    /// Vertex buffer as raw bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer as raw bytes for upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats::from_counts(self.vertex_count() as u64, self.index_count() as u64)
    }
}

/// Generate the grid plane described by `config`.
///
/// Vertex `gy * N + gx` sits at `bounds.min + (gx, gy) / (N - 1) * extent`.
/// Every cell `(gx, gy)` emits `(topLeft, bottomLeft, topRight)` then
/// `(topRight, bottomLeft, bottomRight)`.
///
/// `N = 1` gives a single vertex at `bounds.min` and no triangles; callers
/// that intend to draw should run [`GridConfig::validate`] first. A margin
/// outside `[0, 1)` or a non-finite depth is [`MeshError::InvalidConfiguration`];
/// buffers larger than `memory_budget` are [`MeshError::OutOfMemory`].
pub fn generate_plane(config: &GridConfig) -> Result<GridMesh, MeshError> {
    let n = config.grid_size;
    if n == 0 || n > MAX_GRID_SIZE {
        return Err(MeshError::InvalidGridSize { size: n });
    }
    config.check_geometry()?;
    let _span = tracing::info_span!("generate_plane", grid_size = n).entered();
    let start = Instant::now();

    let expected = config.expected_stats();
    if config
        .memory_budget
        .is_some_and(|budget| expected.total_bytes() > budget)
    {
        return Err(MeshError::OutOfMemory {
            elements: (expected.vertices * 3 + expected.indices) as usize,
            bytes: expected.total_bytes(),
        });
    }
    tracing::info!(
        "vertices: {}m indices: {}m triangles: {}m",
        expected.vertices as usize / MIB,
        expected.indices as usize / MIB,
        expected.triangles as usize / MIB
    );
    tracing::info!(
        "vertex bytes: {}m index bytes: {}m",
        expected.vertex_bytes as usize / MIB,
        expected.index_bytes as usize / MIB
    );

    let n = n as usize;
    let vertex_floats = n
        .checked_mul(n)
        .and_then(|v| v.checked_mul(3))
        .ok_or(MeshError::OutOfMemory {
            elements: usize::MAX,
            bytes: expected.vertex_bytes,
        })?;
    let cells = (n - 1) * (n - 1);
    let index_len = cells.checked_mul(6).ok_or(MeshError::OutOfMemory {
        elements: usize::MAX,
        bytes: expected.index_bytes,
    })?;

    // Per-axis coordinates, computed once so every vertex is a table lookup.
    let bounds = config.bounds();
    let xs = axis_coords(n, bounds.min.x, bounds.max.x);
    let ys = axis_coords(n, bounds.min.y, bounds.max.y);
    let depth = config.depth;

    let vertices = filled_buffer(vertex_floats, config.fill, |i| {
        let v = i / 3;
        match i % 3 {
            0 => xs[v % n],
            1 => ys[v / n],
            _ => depth,
        }
    })?;
    tracing::debug!(elapsed = ?start.elapsed(), "vertices written");

    let row = n as u32;
    let pattern = [0, row, 1, 1, row, row + 1];
    let indices = filled_buffer(index_len, config.fill, |i| {
        let cell = i / 6;
        let (cy, cx) = (cell / (n - 1), cell % (n - 1));
        let top_left = (cy * n + cx) as u32;
        top_left + pattern[i % 6]
    })?;

    tracing::info!(
        elapsed = ?start.elapsed(),
        triangles = indices.len() / 3,
        "plane generated"
    );

    Ok(GridMesh {
        grid_size: config.grid_size,
        vertices,
        indices,
    })
}

/// `n` evenly spaced coordinates from `start` to `end` inclusive.
fn axis_coords(n: usize, start: f32, end: f32) -> Vec<f32> {
    let span = end - start;
    let last = n.saturating_sub(1).max(1) as f32;
    (0..n).map(|g| start + (g as f32 / last) * span).collect()
}
