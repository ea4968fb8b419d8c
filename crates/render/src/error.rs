/// Errors raised while bringing up a backend or handing it geometry.
///
/// Only `Initialization` and `MeshTooLarge` stop the program. Shader
/// diagnostics are reported and rendering carries on with whatever program
/// the backend ended up with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("backend initialization failed: {0}")]
    Initialization(String),
    #[error("mesh buffer of {bytes} bytes exceeds the backend limit of {limit} bytes")]
    MeshTooLarge { bytes: u64, limit: u64 },
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),
    #[error("shader program link failed: {0}")]
    ShaderLink(String),
}

impl RenderError {
    /// Whether rendering can continue after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ShaderCompile(_) | Self::ShaderLink(_))
    }
}
