use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::WindowId;
use log::{debug, error, info, warn};

use crate::engine::config::AppConfig;
use crate::engine::error::InitError;
use crate::engine::graphics::context::GpuContext;
use crate::engine::graphics::renderer::{RenderTarget, Renderer};
use crate::engine::input::InputHandler;
use crate::engine::window::{WindowAction, WindowManager};
use crate::game::quad::controller::FrameController;

pub struct App {
    config: AppConfig,
    window_manager: WindowManager,
    renderer: Option<Renderer>,
    input_handler: InputHandler,
    controller: FrameController,
    fatal: Option<InitError>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppConfig::from_env())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            error!("Initialization failed: {}", e);
            self.fatal = Some(e);
            event_loop.exit();
            return;
        }

        println!("\n-----------------------------------");
        println!("Use the arrows to move the square");
        println!("-----------------------------------");
        self.window_manager.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(action) = WindowManager::translate(&event) else {
            return;
        };
        match action {
            WindowAction::Close => {
                event_loop.exit();
            }
            WindowAction::Redraw => {
                if self.input_handler.close_requested() {
                    event_loop.exit();
                    return;
                }
                self.redraw(event_loop);
                self.window_manager.request_redraw();
            }
            WindowAction::Resize(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(physical_size);
                    debug!("Render target now {}x{}", renderer.size().width, renderer.size().height);
                }
            }
            WindowAction::Key { code, pressed } => {
                self.input_handler.handle_keyboard_input_event(code, pressed);
            }
            WindowAction::Focus(focused) => {
                self.input_handler.handle_window_focus(focused);
            }
        }
    }
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            input_handler: InputHandler::new(config.move_step),
            controller: FrameController::new(config.scale),
            config,
            window_manager: WindowManager::new(),
            renderer: None,
            fatal: None,
        }
    }

    /// Startup failure that ended the event loop, if any.
    pub fn take_error(&mut self) -> Option<InitError> {
        self.fatal.take()
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), InitError> {
        let window = self.window_manager.create_window(event_loop, &self.config)?;
        let size = window.inner_size();

        let (gpu, surface) = pollster::block_on(GpuContext::for_window(window))?;
        let target = RenderTarget::surface(&gpu, surface, size.width, size.height);
        let renderer = Renderer::new(gpu, target, &self.config);
        if !renderer.has_program() {
            warn!("No usable shader program; frames will only be cleared");
        }
        renderer.push_transform(&self.controller.transform(self.input_handler.offset()));

        info!("Window ready: {}x{}", size.width, size.height);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };
        match self.controller.tick(renderer, &mut self.input_handler) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost or outdated, reconfiguring");
                renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(e) => {
                warn!("Skipping frame: {:?}", e);
            }
        }
    }
}
