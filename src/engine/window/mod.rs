pub mod manager;

pub use manager::{WindowAction, WindowManager};
