//! Window management implementation.

use std::sync::Arc;

use log::error;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::Window;

use crate::engine::config::AppConfig;
use crate::engine::error::InitError;

/// What the application should do in response to a window event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WindowAction {
    Close,
    Redraw,
    Resize(PhysicalSize<u32>),
    Key { code: KeyCode, pressed: bool },
    Focus(bool),
}

pub struct WindowManager {
    window: Option<Arc<Window>>,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager {
    pub fn new() -> Self {
        Self { window: None }
    }

    pub fn create_window(&mut self, event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Arc<Window>, InitError> {
        let attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_resizable(true);
        let window = event_loop.create_window(attributes)
            .map_err(|e| {
                error!("Failed to create window: {:?}", e);
                e
            })?;

        let window = Arc::new(window);
        self.window = Some(window.clone());
        Ok(window)
    }

    /// Maps a raw window event onto the handful of actions the app reacts to.
    pub fn translate(event: &WindowEvent) -> Option<WindowAction> {
        match event {
            WindowEvent::CloseRequested => Some(WindowAction::Close),
            WindowEvent::RedrawRequested => Some(WindowAction::Redraw),
            WindowEvent::Resized(physical_size) => Some(WindowAction::Resize(*physical_size)),
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => Some(WindowAction::Key {
                    code,
                    pressed: event.state == ElementState::Pressed,
                }),
                PhysicalKey::Unidentified(_) => None,
            },
            WindowEvent::Focused(focused) => Some(WindowAction::Focus(*focused)),
            _ => None,
        }
    }

    pub fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_events_map_to_actions() {
        assert_eq!(
            WindowManager::translate(&WindowEvent::CloseRequested),
            Some(WindowAction::Close)
        );
        assert_eq!(
            WindowManager::translate(&WindowEvent::RedrawRequested),
            Some(WindowAction::Redraw)
        );
        assert_eq!(
            WindowManager::translate(&WindowEvent::Resized(PhysicalSize::new(1024, 768))),
            Some(WindowAction::Resize(PhysicalSize::new(1024, 768)))
        );
        assert_eq!(
            WindowManager::translate(&WindowEvent::Focused(false)),
            Some(WindowAction::Focus(false))
        );
    }

    #[test]
    fn unrelated_events_are_ignored() {
        assert_eq!(WindowManager::translate(&WindowEvent::Destroyed), None);
        assert_eq!(WindowManager::translate(&WindowEvent::Occluded(true)), None);
    }

    #[test]
    fn redraw_before_window_creation_is_a_no_op() {
        let manager = WindowManager::new();
        manager.request_redraw();
    }
}
