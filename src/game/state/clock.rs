//! Elapsed-time source and frame counter.

use std::time::Instant;

pub struct FrameClock {
    start: Instant,
    last_fps_print: Instant,
    frame_count: u32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_fps_print: now,
            frame_count: 0,
        }
    }

    /// Seconds since the clock was created. Never decreases.
    pub fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Counts a frame; returns the frame rate once per elapsed second.
    pub fn tick_frame(&mut self) -> Option<u32> {
        self.frame_count += 1;

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_fps_print);
        if elapsed.as_secs_f32() >= 1.0 {
            let fps = self.frame_count;
            self.frame_count = 0;
            self.last_fps_print = now;
            Some(fps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let clock = FrameClock::new();
        let mut last = clock.elapsed_secs();
        for _ in 0..100 {
            let now = clock.elapsed_secs();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn fps_is_not_reported_before_a_second_passes() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick_frame(), None);
        assert_eq!(clock.tick_frame(), None);
    }
}
