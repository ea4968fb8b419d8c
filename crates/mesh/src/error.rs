/// Errors from mesh configuration, generation, and export.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("invalid grid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("grid size {size} cannot produce a mesh")]
    InvalidGridSize { size: u32 },
    #[error("out of memory: cannot allocate {elements} elements ({bytes} bytes)")]
    OutOfMemory { elements: usize, bytes: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
