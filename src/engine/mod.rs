//! Engine module containing configuration, errors, graphics, input, and window management.

pub mod config;
pub mod error;
pub mod graphics;
pub mod input;
pub mod window;

// Re-export commonly used types
pub use graphics::{renderer::Renderer, shader::ShaderProgram, texture::TextureSet, vertex::Vertex};
