//! Library entry point: a textured quad moved with the arrow keys.

pub mod engine;
pub mod game;

// Re-export main types for convenience
pub use engine::config::AppConfig;
pub use game::App;
