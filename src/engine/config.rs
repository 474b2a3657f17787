//! Application constants, gathered in one place.

use std::path::{Path, PathBuf};

use crate::engine::graphics::texture::PixelFormat;

/// Environment variable that relocates relative asset paths.
pub const ASSET_DIR_ENV: &str = "QUAD_ASSET_DIR";

/// Where one texture comes from and which unit it lands on.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSpec {
    pub path: PathBuf,
    pub unit: u32,
    pub format: PixelFormat,
    pub flip_vertical: bool,
    /// Sampler uniform fed by this unit.
    pub uniform: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub textures: Vec<TextureSpec>,
    pub move_step: f32,
    pub scale: f32,
    pub clear_color: wgpu::Color,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Transform Quad".to_string(),
            width: 800,
            height: 600,
            vertex_shader: PathBuf::from("shaders/quad.vert.wgsl"),
            fragment_shader: PathBuf::from("shaders/quad.frag.wgsl"),
            textures: vec![
                TextureSpec {
                    path: PathBuf::from("textures/container.png"),
                    unit: 0,
                    format: PixelFormat::Rgb,
                    flip_vertical: false,
                    uniform: "myTexture".to_string(),
                },
                TextureSpec {
                    path: PathBuf::from("textures/face.png"),
                    unit: 1,
                    format: PixelFormat::Rgba,
                    flip_vertical: true,
                    uniform: "myTexture2".to_string(),
                },
            ],
            move_step: 0.0005,
            scale: 0.5,
            clear_color: wgpu::Color {
                r: 0.2,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            },
        }
    }
}

impl AppConfig {
    /// Defaults, with asset paths rebased onto `$QUAD_ASSET_DIR` when set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var_os(ASSET_DIR_ENV) {
            Some(dir) => config.with_asset_root(dir),
            None => config,
        }
    }

    /// Rebases every relative asset path onto `root`.
    pub fn with_asset_root(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        };
        rebase(&mut self.vertex_shader);
        rebase(&mut self.fragment_shader);
        for spec in &mut self.textures {
            rebase(&mut spec.path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_scene() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.move_step, 0.0005);
        assert_eq!(config.scale, 0.5);
        let units: Vec<u32> = config.textures.iter().map(|t| t.unit).collect();
        assert_eq!(units, vec![0, 1]);
        assert_eq!(config.textures[0].format, PixelFormat::Rgb);
        assert_eq!(config.textures[1].format, PixelFormat::Rgba);
    }

    #[test]
    fn asset_root_only_touches_relative_paths() {
        let mut config = AppConfig::default();
        let absolute = std::env::temp_dir().join("abs.wgsl");
        config.fragment_shader = absolute.clone();

        let config = config.with_asset_root("/opt/quad");
        assert_eq!(
            config.vertex_shader,
            Path::new("/opt/quad").join("shaders/quad.vert.wgsl")
        );
        assert_eq!(config.fragment_shader, absolute);
        assert!(config.textures.iter().all(|t| t.path.starts_with("/opt/quad")));
    }
}
