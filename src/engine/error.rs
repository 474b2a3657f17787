//! Error types shared across the engine.

use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. Any of these aborts the application.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter found")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Which programmable stage a shader diagnostic belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader source {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} shader failed to compile:\n{diagnostic}")]
    Compile { stage: Stage, diagnostic: String },
    #[error("shader program failed to link:\n{diagnostic}")]
    Link { diagnostic: String },
    #[error("no uniform named `{0}` in shader program")]
    UnknownUniform(String),
    #[error("uniform `{name}` is a {actual}, not a {expected}")]
    UniformKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl ShaderError {
    /// Compiler or linker output, when the error carries any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ShaderError::Compile { diagnostic, .. } | ShaderError::Link { diagnostic } => {
                Some(diagnostic)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load texture data from {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture unit {0} is out of range")]
    InvalidUnit(u32),
}
