pub mod app;
pub mod controller;
pub mod transform;

pub use app::App;
pub use controller::FrameController;
pub use transform::compose_transform;
