pub mod context;
pub mod geometry;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use context::GpuContext;
pub use geometry::GeometryBuffer;
pub use renderer::Renderer;
pub use shader::ShaderProgram;
pub use texture::{Texture, TextureSet};
pub use vertex::Vertex;
