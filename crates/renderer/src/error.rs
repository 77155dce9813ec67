use std::path::PathBuf;

/// Failures that stop the harness before the render loop starts.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to get the rendering context: {reason}")]
    ContextUnavailable { reason: String },
    #[error("no shader block with id '{id}' found in {document}")]
    ShaderSourceMissing { id: String, document: String },
    #[error("failed to read shader source at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to compile {stage} shader: {message}")]
    ShaderCompile {
        stage: &'static str,
        message: String,
    },
    #[error("program has no vertex input named '{name}'")]
    MissingAttribute { name: String },
    #[error("failed to build render pipeline: {message}")]
    Pipeline { message: String },
}

impl HarnessError {
    pub fn is_context_unavailable(&self) -> bool {
        matches!(self, HarnessError::ContextUnavailable { .. })
    }
}

/// Per-frame failures. None of them stop the render loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("surface lost")]
    SurfaceLost,
    #[error("surface outdated")]
    SurfaceOutdated,
    #[error("timed out acquiring the next frame")]
    Timeout,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("draw issued before the pipeline was bound")]
    NotReady,
    #[error("{0}")]
    Other(String),
}

impl From<wgpu::SurfaceError> for FrameError {
    fn from(value: wgpu::SurfaceError) -> Self {
        match value {
            wgpu::SurfaceError::Lost => FrameError::SurfaceLost,
            wgpu::SurfaceError::Outdated => FrameError::SurfaceOutdated,
            wgpu::SurfaceError::Timeout => FrameError::Timeout,
            wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
            other => FrameError::Other(format!("{other:?}")),
        }
    }
}
