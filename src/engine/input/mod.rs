//! Input handling module
//! This module turns keyboard events into held-key state and the quad's offset.

pub mod handler;

pub use handler::{Direction, InputHandler, InputOffset};
