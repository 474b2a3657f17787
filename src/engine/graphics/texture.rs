use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use log::{error, info, warn};
use wgpu;

use crate::engine::error::{ShaderError, TextureError};
use crate::engine::graphics::shader::{ShaderProgram, TEXTURE_GROUP};

/// Number of texture units a `TextureSet` manages.
pub const TEXTURE_UNITS: u32 = 2;

/// Texel format of every uploaded texture. Texels are sampled as stored, with
/// no sRGB decode, so they match the non-sRGB render targets.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Channel layout a source image is decoded into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelFormat {
    /// Three channels; any alpha in the file is discarded.
    Rgb,
    Rgba,
}

/// Decodes an image file to RGBA8 pixels in the requested channel layout.
pub fn decode_image(path: &Path, format: PixelFormat, flip_vertical: bool) -> Result<RgbaImage, TextureError> {
    let img = image::open(path).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let img = if flip_vertical { img.flipv() } else { img };

    // wgpu has no three-channel formats, so RGB is widened with opaque alpha.
    Ok(match format {
        PixelFormat::Rgb => DynamicImage::ImageRgb8(img.to_rgb8()).to_rgba8(),
        PixelFormat::Rgba => img.to_rgba8(),
    })
}

/// Levels in a full mip chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Repeat wrapping and linear filtering on the base level only. The mip chain
/// is uploaded but `lod_max_clamp` keeps minification from reaching it.
pub fn sampler_descriptor() -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("Texture Sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        lod_min_clamp: 0.0,
        lod_max_clamp: 0.0,
        ..Default::default()
    }
}

/// Base image followed by each successively halved level.
pub fn build_mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let levels = mip_level_count(base.width(), base.height());
    let mut chain = Vec::with_capacity(levels as usize);
    chain.push(base);
    for level in 1..levels {
        let prev = &chain[level as usize - 1];
        let width = (prev.width() / 2).max(1);
        let height = (prev.height() / 2).max(1);
        let next = image::imageops::resize(prev, width, height, FilterType::Triangle);
        chain.push(next);
    }
    chain
}

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        format: PixelFormat,
        flip_vertical: bool,
    ) -> Result<Self, TextureError> {
        let rgba = decode_image(path, format, flip_vertical)?;
        let (width, height) = rgba.dimensions();
        let levels = build_mip_chain(rgba);
        info!(
            "[texture] Loaded texture: {}x{} ({} mip levels) from {}",
            width,
            height,
            levels.len(),
            path.display()
        );
        Ok(Self::from_levels(device, queue, &levels, "Texture"))
    }

    /// Uploads a prepared mip chain; `levels[0]` is the base image.
    pub fn from_levels(device: &wgpu::Device, queue: &wgpu::Queue, levels: &[RgbaImage], label: &str) -> Self {
        let (width, height) = levels[0].dimensions();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            label: Some(label),
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            let (w, h) = level.dimensions();
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                level.as_raw(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&sampler_descriptor());

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// 2x2 checkerboard bound in place of textures that failed to load.
    pub fn create_default(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let data = vec![
            255, 0, 0, 255,   0, 255, 0, 255,  // Red, Green
            0, 0, 255, 255,   255, 255, 255, 255,  // Blue, White
        ];
        let checker = RgbaImage::from_raw(2, 2, data).unwrap_or_else(|| RgbaImage::new(2, 2));
        Self::from_levels(device, queue, &[checker], "Default Texture")
    }
}

/// Fixed set of texture units feeding the fragment stage. A `None` slot is
/// unbound.
pub struct TextureSet {
    slots: Vec<Option<Texture>>,
    placeholder: Texture,
    bind_group: Option<wgpu::BindGroup>,
}

impl TextureSet {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            slots: (0..TEXTURE_UNITS).map(|_| None).collect(),
            placeholder: Texture::create_default(device, queue),
            bind_group: None,
        }
    }

    /// Loads `path` into `unit`. On failure the unit is left unbound.
    pub fn load_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        unit: u32,
        format: PixelFormat,
        flip_vertical: bool,
    ) -> Result<&Texture, TextureError> {
        let slot = self
            .slots
            .get_mut(unit as usize)
            .ok_or(TextureError::InvalidUnit(unit))?;
        *slot = None;
        self.bind_group = None;

        let texture = Texture::load(device, queue, path, format, flip_vertical)?;
        let texture: &Texture = slot.insert(texture);
        Ok(texture)
    }

    pub fn is_bound(&self, unit: u32) -> bool {
        self.slots
            .get(unit as usize)
            .is_some_and(Option::is_some)
    }

    fn texture_for(&self, unit: u32) -> &Texture {
        match self.slots.get(unit as usize) {
            Some(Some(texture)) => texture,
            _ => &self.placeholder,
        }
    }

    /// Wires each unit into the program's texture uniforms. A bind group the
    /// device rejects is reported as a link error and nothing is attached.
    pub fn attach(&mut self, device: &wgpu::Device, program: &ShaderProgram) -> Result<(), ShaderError> {
        let bindings = program.texture_bindings();
        self.bind_group = None;
        let mut entries = Vec::with_capacity(bindings.len() * 2);
        for binding in &bindings {
            if binding.unit >= TEXTURE_UNITS {
                error!("[texture] Texture unit {} does not exist", binding.unit);
            } else if !self.is_bound(binding.unit) {
                warn!("[texture] Texture unit {} is unbound, sampling placeholder", binding.unit);
            }
            let texture = self.texture_for(binding.unit);
            entries.push(wgpu::BindGroupEntry {
                binding: binding.texture_binding,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: binding.sampler_binding,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout: program.texture_layout(),
            entries: &entries,
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link {
                diagnostic: e.to_string(),
            });
        }
        self.bind_group = Some(bind_group);
        Ok(())
    }

    pub fn bind<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        if let Some(bind_group) = &self.bind_group {
            render_pass.set_bind_group(TEXTURE_GROUP, bind_group, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");
        match decode_image(&path, PixelFormat::Rgb, false) {
            Err(TextureError::Decode { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected decode error, got {:?}", other.map(|i| i.dimensions())),
        }
    }

    #[test]
    fn rgb_images_are_widened_with_opaque_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(1, 0, Rgb([10, 20, 30]));
        img.save(&path).unwrap();

        let decoded = decode_image(&path, PixelFormat::Rgb, false).unwrap();
        assert_eq!(decoded.dimensions(), (4, 2));
        assert_eq!(*decoded.get_pixel(1, 0), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn rgb_format_discards_alpha_from_rgba_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([1, 2, 3, 4]));
        img.save(&path).unwrap();

        let as_rgb = decode_image(&path, PixelFormat::Rgb, false).unwrap();
        let as_rgba = decode_image(&path, PixelFormat::Rgba, false).unwrap();
        assert_eq!(*as_rgb.get_pixel(0, 0), Rgba([1, 2, 3, 255]));
        assert_eq!(*as_rgba.get_pixel(0, 0), Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn flip_moves_top_row_to_bottom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flip.png");
        let mut img = RgbaImage::new(1, 3);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.save(&path).unwrap();

        let flipped = decode_image(&path, PixelFormat::Rgba, true).unwrap();
        assert_eq!(*flipped.get_pixel(0, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(*flipped.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn mip_count_covers_down_to_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(512, 512), 10);
        assert_eq!(mip_level_count(800, 600), 10);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn mip_chain_halves_each_axis_independently() {
        let chain = build_mip_chain(RgbaImage::new(8, 2));
        let dims: Vec<_> = chain.iter().map(|l| l.dimensions()).collect();
        assert_eq!(dims, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn sampler_reads_only_the_base_level() {
        let desc = sampler_descriptor();
        assert_eq!(desc.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::Repeat);
        assert_eq!(desc.lod_max_clamp, 0.0);
    }

    #[test]
    fn textures_are_not_srgb_decoded() {
        assert!(!TEXTURE_FORMAT.is_srgb());
    }

    #[test]
    fn mip_chain_averages_solid_color() {
        let base = RgbaImage::from_pixel(4, 4, Rgba([40, 80, 120, 255]));
        let chain = build_mip_chain(base);
        let last = chain.last().unwrap();
        assert_eq!(last.dimensions(), (1, 1));
        assert_eq!(*last.get_pixel(0, 0), Rgba([40, 80, 120, 255]));
    }
}
