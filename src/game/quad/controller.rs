use glam::Mat4;
use log::debug;

use crate::engine::graphics::renderer::Renderer;
use crate::engine::input::{InputHandler, InputOffset};
use crate::game::quad::transform::compose_transform;
use crate::game::state::clock::FrameClock;

/// Drives one frame of the scene.
pub struct FrameController {
    clock: FrameClock,
    scale: f32,
}

impl FrameController {
    pub fn new(scale: f32) -> Self {
        Self {
            clock: FrameClock::new(),
            scale,
        }
    }

    /// Transform for the given offset at the current time.
    pub fn transform(&self, offset: InputOffset) -> Mat4 {
        compose_transform(offset.as_vec2(), self.clock.elapsed_secs(), self.scale)
    }

    /// Clear and draw, update the transform, apply input, present.
    ///
    /// The transform is written after the draw is submitted, so each frame
    /// shows the transform computed on the previous tick.
    pub fn tick(&mut self, renderer: &Renderer, input: &mut InputHandler) -> Result<(), wgpu::SurfaceError> {
        let frame = renderer.render_frame()?;

        let transform = self.transform(input.offset());
        renderer.push_transform(&transform);

        let keys = input.poll();
        input.apply_delta(&keys);

        frame.present();

        if let Some(fps) = self.clock.tick_frame() {
            debug!("FPS: {}", fps);
        }
        Ok(())
    }
}
