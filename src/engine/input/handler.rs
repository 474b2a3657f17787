use std::collections::HashSet;

use glam::Vec2;
use log::debug;
use winit::keyboard::KeyCode;

/// Arrow-key directions the quad can be pushed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Right, Direction::Left, Direction::Up, Direction::Down];

    pub fn key(self) -> KeyCode {
        match self {
            Direction::Left => KeyCode::ArrowLeft,
            Direction::Right => KeyCode::ArrowRight,
            Direction::Up => KeyCode::ArrowUp,
            Direction::Down => KeyCode::ArrowDown,
        }
    }

    /// Unit movement along x/y.
    pub fn axis(self) -> Vec2 {
        match self {
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Up => Vec2::new(0.0, 1.0),
            Direction::Down => Vec2::new(0.0, -1.0),
        }
    }
}

/// Accumulated translation of the quad. Never clamped.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct InputOffset {
    pub x: f32,
    pub y: f32,
}

impl InputOffset {
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Held-key state sampled once per frame.
pub struct InputHandler {
    pub move_step: f32,
    pressed_keys: HashSet<KeyCode>,
    offset: InputOffset,
    close_requested: bool,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new(0.0005)
    }
}

impl InputHandler {
    pub fn new(move_step: f32) -> Self {
        Self {
            move_step,
            pressed_keys: HashSet::new(),
            offset: InputOffset::default(),
            close_requested: false,
        }
    }

    pub fn handle_keyboard_input_event(&mut self, keycode: KeyCode, pressed: bool) {
        if pressed {
            if keycode == KeyCode::Escape {
                debug!("Escape pressed, requesting close");
                self.close_requested = true;
            }
            self.pressed_keys.insert(keycode);
        } else {
            self.pressed_keys.remove(&keycode);
        }
    }

    /// Releases everything on focus loss so keys cannot stick.
    pub fn handle_window_focus(&mut self, focused: bool) {
        if !focused {
            self.pressed_keys.clear();
        }
    }

    /// Directions whose key is currently held.
    pub fn poll(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|dir| self.pressed_keys.contains(&dir.key()))
            .collect()
    }

    /// Moves the offset one step per held direction.
    pub fn apply_delta(&mut self, keys: &[Direction]) {
        if keys.is_empty() {
            return;
        }
        for dir in keys {
            let delta = dir.axis() * self.move_step;
            self.offset.x += delta.x;
            self.offset.y += delta.y;
        }
        debug!("Offset moved: ({}, {})", self.offset.x, self.offset.y);
    }

    pub fn offset(&self) -> InputOffset {
        self.offset
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn tick(input: &mut InputHandler) {
        let keys = input.poll();
        input.apply_delta(&keys);
    }

    #[test]
    fn holding_right_accumulates_linearly() {
        let mut input = InputHandler::default();
        input.handle_keyboard_input_event(KeyCode::ArrowRight, true);
        for n in 1..=1000u32 {
            tick(&mut input);
            let expected = n as f32 * 0.0005;
            assert!((input.offset().x - expected).abs() < EPS, "tick {n}");
        }
        assert_eq!(input.offset().y, 0.0);
    }

    #[test]
    fn each_direction_moves_along_its_axis() {
        for (key, expected) in [
            (KeyCode::ArrowLeft, (-0.0005, 0.0)),
            (KeyCode::ArrowRight, (0.0005, 0.0)),
            (KeyCode::ArrowUp, (0.0, 0.0005)),
            (KeyCode::ArrowDown, (0.0, -0.0005)),
        ] {
            let mut input = InputHandler::default();
            input.handle_keyboard_input_event(key, true);
            tick(&mut input);
            let offset = input.offset();
            assert!((offset.x - expected.0).abs() < 1e-7, "{key:?}");
            assert!((offset.y - expected.1).abs() < 1e-7, "{key:?}");
        }
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut input = InputHandler::default();
        input.handle_keyboard_input_event(KeyCode::ArrowLeft, true);
        input.handle_keyboard_input_event(KeyCode::ArrowRight, true);
        for _ in 0..50 {
            tick(&mut input);
        }
        assert!(input.offset().x.abs() < 1e-6);
    }

    #[test]
    fn released_keys_stop_moving() {
        let mut input = InputHandler::default();
        input.handle_keyboard_input_event(KeyCode::ArrowUp, true);
        tick(&mut input);
        input.handle_keyboard_input_event(KeyCode::ArrowUp, false);
        tick(&mut input);
        tick(&mut input);
        assert!((input.offset().y - 0.0005).abs() < 1e-7);
    }

    #[test]
    fn offset_is_not_clamped() {
        let mut input = InputHandler::new(0.5);
        input.handle_keyboard_input_event(KeyCode::ArrowDown, true);
        for _ in 0..100 {
            tick(&mut input);
        }
        assert!((input.offset().y + 50.0).abs() < EPS);
    }

    #[test]
    fn poll_ignores_non_direction_keys() {
        let mut input = InputHandler::default();
        input.handle_keyboard_input_event(KeyCode::KeyW, true);
        input.handle_keyboard_input_event(KeyCode::Space, true);
        assert!(input.poll().is_empty());
    }

    #[test]
    fn escape_raises_close_signal() {
        let mut input = InputHandler::default();
        assert!(!input.close_requested());
        input.handle_keyboard_input_event(KeyCode::Escape, true);
        assert!(input.close_requested());
        input.handle_keyboard_input_event(KeyCode::Escape, false);
        assert!(input.close_requested());
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let mut input = InputHandler::default();
        input.handle_keyboard_input_event(KeyCode::ArrowRight, true);
        input.handle_window_focus(false);
        assert!(input.poll().is_empty());
    }
}
