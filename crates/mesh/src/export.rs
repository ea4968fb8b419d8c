//! Wavefront OBJ export of a generated plane.
//!
//! Writes `v x y z` lines followed by `f a b c` lines (1-based). Normals are
//! not written; the plane faces +z by construction.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::MeshError;
use crate::grid::GridMesh;

const PROGRESS_STRIDE: usize = 1024 * 1024;

/// Write `mesh` as OBJ text into `out`.
pub fn write_obj<W: Write>(mut out: W, mesh: &GridMesh) -> Result<(), MeshError> {
    for (i, v) in mesh.vertices().chunks_exact(3).enumerate() {
        writeln!(out, "v {} {} {}", v[0], v[1], v[2])?;
        if i % PROGRESS_STRIDE == 0 {
            tracing::debug!("write: {}m vertices", i / PROGRESS_STRIDE);
        }
    }

    for (i, tri) in mesh.indices().chunks_exact(3).enumerate() {
        writeln!(out, "f {} {} {}", tri[0] + 1, tri[1] + 1, tri[2] + 1)?;
        if i % PROGRESS_STRIDE == 0 {
            tracing::debug!("write: {}m faces", i / PROGRESS_STRIDE);
        }
    }

    out.flush()?;
    Ok(())
}

/// Create `path` and write `mesh` into it as OBJ.
pub fn export_obj(path: impl AsRef<Path>, mesh: &GridMesh) -> Result<(), MeshError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_obj(BufWriter::new(file), mesh)?;
    tracing::info!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.triangle_count(),
        "mesh exported"
    );
    Ok(())
}
