use glam::Mat4;
use log::{error, info, warn};
use wgpu;

use crate::engine::config::AppConfig;
use crate::engine::graphics::context::GpuContext;
use crate::engine::graphics::geometry::GeometryBuffer;
use crate::engine::graphics::shader::ShaderProgram;
use crate::engine::graphics::texture::TextureSet;
use crate::engine::graphics::vertex::{QUAD_INDICES, QUAD_VERTICES};

/// Uniform the per-frame transform is written to.
pub const TRANSFORM_UNIFORM: &str = "transMat";

/// Prefers a format that stores clear colors and fragment output unencoded,
/// the way a default GL framebuffer does.
pub fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

/// Where frames end up.
pub enum RenderTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        width: u32,
        height: u32,
    },
}

impl RenderTarget {
    pub fn surface(gpu: &GpuContext, surface: wgpu::Surface<'static>, width: u32, height: u32) -> Self {
        let surface_caps = surface.get_capabilities(&gpu.adapter);
        let surface_format = pick_surface_format(&surface_caps.formats)
            .unwrap_or(wgpu::TextureFormat::Bgra8Unorm);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);
        Self::Surface { surface, config }
    }

    pub fn offscreen(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self::Offscreen {
            texture: Self::offscreen_texture(device, width, height),
            width,
            height,
        }
    }

    fn offscreen_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            label: Some("Offscreen Target"),
            view_formats: &[],
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            RenderTarget::Surface { config, .. } => config.format,
            RenderTarget::Offscreen { texture, .. } => texture.format(),
        }
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        match self {
            RenderTarget::Surface { config, .. } => winit::dpi::PhysicalSize::new(config.width, config.height),
            RenderTarget::Offscreen { width, height, .. } => winit::dpi::PhysicalSize::new(*width, *height),
        }
    }
}

/// A rendered frame waiting to be shown.
pub struct Frame {
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl Frame {
    pub fn present(self) {
        if let Some(surface_texture) = self.surface_texture {
            surface_texture.present();
        }
    }
}

pub struct Renderer {
    pub gpu: GpuContext,
    target: RenderTarget,
    clear_color: wgpu::Color,
    program: Option<ShaderProgram>,
    geometry: GeometryBuffer,
    textures: TextureSet,
}

impl Renderer {
    /// Creates every GPU resource the scene needs. Shader and texture
    /// failures are logged and leave the renderer in a degraded state.
    pub fn new(gpu: GpuContext, target: RenderTarget, config: &AppConfig) -> Self {
        let mut program = match ShaderProgram::from_files(
            &gpu.device,
            target.format(),
            &config.vertex_shader,
            &config.fragment_shader,
        ) {
            Ok(program) => Some(program),
            Err(e) => {
                error!("Shader program unusable: {}", e);
                None
            }
        };

        let geometry = GeometryBuffer::upload(&gpu.device, QUAD_VERTICES, QUAD_INDICES);

        let mut textures = TextureSet::new(&gpu.device, &gpu.queue);
        for spec in &config.textures {
            if let Err(e) = textures.load_texture(
                &gpu.device,
                &gpu.queue,
                &spec.path,
                spec.unit,
                spec.format,
                spec.flip_vertical,
            ) {
                error!("Failed to load texture data: {}", e);
            }
        }

        if let Some(program) = program.as_mut() {
            for spec in &config.textures {
                if let Err(e) = program.set_int(&spec.uniform, spec.unit as i32) {
                    warn!("Cannot assign texture unit {}: {}", spec.unit, e);
                }
            }
        }
        let attached = match program.as_ref() {
            Some(linked) => textures.attach(&gpu.device, linked),
            None => Ok(()),
        };
        if let Err(e) = attached {
            error!("Shader program unusable: {}", e);
            program = None;
        }

        info!("Renderer ready ({:?})", target.format());

        Self {
            gpu,
            target,
            clear_color: config.clear_color,
            program,
            geometry,
            textures,
        }
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    pub fn size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.target.size()
    }

    /// Resizes the target. A zero-sized request (minimized window) is ignored.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        match &mut self.target {
            RenderTarget::Surface { surface, config } => {
                config.width = new_size.width;
                config.height = new_size.height;
                surface.configure(&self.gpu.device, config);
            }
            RenderTarget::Offscreen { texture, width, height } => {
                *texture = RenderTarget::offscreen_texture(&self.gpu.device, new_size.width, new_size.height);
                *width = new_size.width;
                *height = new_size.height;
            }
        }
    }

    /// Reapplies the current surface configuration after `Lost`/`Outdated`.
    pub fn reconfigure(&mut self) {
        if let RenderTarget::Surface { surface, config } = &self.target {
            surface.configure(&self.gpu.device, config);
        }
    }

    /// Clears the target and draws the quad. The frame is submitted but not
    /// yet presented.
    pub fn render_frame(&self) -> Result<Frame, wgpu::SurfaceError> {
        let (surface_texture, view) = match &self.target {
            RenderTarget::Surface { surface, .. } => {
                let frame = surface.get_current_texture()?;
                let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
                (Some(frame), view)
            }
            RenderTarget::Offscreen { texture, .. } => {
                (None, texture.create_view(&wgpu::TextureViewDescriptor::default()))
            }
        };

        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(program) = &self.program {
                program.bind(&mut render_pass);
                self.textures.bind(&mut render_pass);
                self.geometry.draw(&mut render_pass);
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(Frame { surface_texture })
    }

    /// Writes the transform uniform; it is picked up by the next submitted frame.
    pub fn push_transform(&self, transform: &Mat4) {
        if let Some(program) = &self.program {
            if let Err(e) = program.set_matrix4(&self.gpu.queue, TRANSFORM_UNIFORM, transform) {
                error!("Failed to update transform: {}", e);
            }
        }
    }

    /// Copies the offscreen target back to the CPU as tightly packed RGBA8 rows.
    /// Returns `None` for surface targets or when mapping fails.
    pub fn read_pixels(&self) -> Option<Vec<u8>> {
        let RenderTarget::Offscreen { texture, width, height } = &self.target else {
            return None;
        };
        let (width, height) = (*width, *height);
        let unpadded = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.gpu.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Failed to map readback buffer: {}", e);
                return None;
            }
            Err(e) => {
                error!("Readback callback dropped: {}", e);
                return None;
            }
        }

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        Some(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn surface_format_prefers_unencoded_storage() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(pick_surface_format(&formats), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn surface_format_falls_back_to_first_offered() {
        assert_eq!(
            pick_surface_format(&[TextureFormat::Rgba8UnormSrgb]),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(pick_surface_format(&[]), None);
    }
}
