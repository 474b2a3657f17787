use std::sync::Arc;

use log::info;
use winit::window::Window;

use crate::engine::error::InitError;

/// Device-level handles shared by everything that touches the GPU.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Creates a context able to present to `window`, plus the window's surface.
    pub async fn for_window(window: Arc<Window>) -> Result<(Self, wgpu::Surface<'static>), InitError> {
        let instance = Self::instance();
        let surface = instance.create_surface(window)?;
        let gpu = Self::request(instance, Some(&surface)).await?;
        Ok((gpu, surface))
    }

    /// Creates a context with no presentation surface, for offscreen rendering.
    pub async fn headless() -> Result<Self, InitError> {
        Self::request(Self::instance(), None).await
    }

    fn instance() -> wgpu::Instance {
        wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    async fn request(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, InitError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(InitError::NoAdapter)?;
        let adapter_info = adapter.get_info();
        info!("Using adapter: {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}
