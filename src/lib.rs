use std::fmt::Display;
use std::time::{Duration, Instant};

use log::debug;

pub mod audio;
pub mod console;
pub mod core;
pub mod input;
pub mod pipeline;

pub use console::{Console, ConsoleConfig, ConsoleHandle};
pub use core::Color;
pub use core::Glyph;
pub use core::GlyphGrid;
pub use input::{KeyEvent, KeyQueue, Modifiers};
pub use minifb::Key;

pub struct Metrics {
    pub last_frame: Instant,
    pub fps_counter: u32,
    pub fps_update_timer: Instant,
    pub current_fps: f32,
    pub frame_times: Vec<f32>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            fps_counter: 0,
            fps_update_timer: Instant::now(),
            current_fps: 0.0,
            frame_times: Vec::with_capacity(120),
        }
    }

    /// Account one presented frame; reports once per second at debug level.
    pub fn frame(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.fps_counter += 1;
        self.frame_times.push(delta.as_secs_f32() * 1000.0);

        let elapsed = now.duration_since(self.fps_update_timer);
        if elapsed >= Duration::from_secs(1) {
            self.current_fps = self.fps_counter as f32 / elapsed.as_secs_f32();
            debug!("{}", self);
            self.fps_counter = 0;
            self.frame_times.clear();
            self.fps_update_timer = now;
        }
    }
}

impl Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let avg = if self.frame_times.is_empty() {
            0.0
        } else {
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
        };
        write!(
            f,
            "FPS: {:.2} | Avg: {:.2}ms | Min: {:.2}ms | Max: {:.2}ms",
            self.current_fps,
            avg,
            self.frame_times
                .iter()
                .copied()
                .reduce(f32::min)
                .unwrap_or(0.0),
            self.frame_times
                .iter()
                .copied()
                .reduce(f32::max)
                .unwrap_or(0.0)
        )
    }
}

/// Formatted printing through a [`ConsoleHandle`], `printf` style.
#[macro_export]
macro_rules! cprint {
    ($console:expr, $fg:expr, $bg:expr, $($arg:tt)*) => {
        $console.print($fg, $bg, &format!($($arg)*))
    };
}
