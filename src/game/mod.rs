//! Scene-specific logic: the quad, its per-frame update and timing.

pub mod quad;
pub mod state;

// Re-export commonly used types
pub use quad::{app::App, controller::FrameController};
