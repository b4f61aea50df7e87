use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::info;
use minifb::{Key, KeyRepeat, Scale, ScaleMode, Window, WindowOptions};
use rodio::OutputStream;

use crate::audio::Beeper;
use crate::core::color::Color;
use crate::core::grid::GlyphGrid;
use crate::core::tileset::Tileset;
use crate::input::{KeyEvent, KeyQueue, Modifiers};
use crate::pipeline::CellRenderer;
use crate::Metrics;

pub struct ConsoleConfig {
    pub title: String,
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    pub tileset: PathBuf,
    /// Tile width in pixels.
    pub cell_w: usize,
    /// Tile height in pixels.
    pub cell_h: usize,
    pub target_fps: usize,
    /// Clear per-cell dirty flags after each draw pass. Off by default: the
    /// legacy behavior leaves flags set, so marked cells repaint every pass.
    pub clear_dirty: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            title: "Console".to_string(),
            width: 80,
            height: 25,
            tileset: PathBuf::from("assets/VGA8x16.png"),
            cell_w: 8,
            cell_h: 16,
            target_fps: 60,
            clear_dirty: false,
        }
    }
}

/// State shared between the render loop and the game thread.
struct Shared {
    grid: Mutex<GlyphGrid>,
    keys: KeyQueue,
    running: AtomicBool,
    /// Set by every grid mutation; tells the render loop a frame is worth
    /// rasterizing. Cleared by the loop when it consumes the signal.
    touched: AtomicBool,
    beeper: Beeper,
}

impl Shared {
    fn new(grid: GlyphGrid, beeper: Beeper) -> Self {
        Shared {
            grid: Mutex::new(grid),
            keys: KeyQueue::new(),
            running: AtomicBool::new(true),
            touched: AtomicBool::new(true),
            beeper,
        }
    }

    // Keep rendering even if a writer panicked mid-frame; the grid is a
    // plain value and every write to it is complete-or-absent.
    fn lock_grid(&self) -> MutexGuard<'_, GlyphGrid> {
        self.grid.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A windowed character console.
///
/// `init` builds the window, tileset and glyph grid; `start` spawns the
/// caller's game closure on its own thread and runs the render loop on the
/// current one until the window closes or the game signals quit, then joins
/// the game thread and yields its exit code.
pub struct Console {
    config: ConsoleConfig,
    window: Window,
    renderer: CellRenderer,
    shared: Arc<Shared>,
    fullscreen: bool,
    force_redraw: bool,
    // Keeps the output device alive; must not leave this thread.
    _audio: Option<OutputStream>,
}

impl Console {
    /// Open a console with a `width` x `height` cell grid drawn from the
    /// tileset image at `tileset`, whose tiles are `cell_w` x `cell_h`
    /// pixels. The window opens at twice the grid's pixel size.
    pub fn init(
        title: &str,
        width: usize,
        height: usize,
        tileset: impl AsRef<Path>,
        cell_w: usize,
        cell_h: usize,
    ) -> io::Result<Self> {
        Self::with_config(ConsoleConfig {
            title: title.to_string(),
            width,
            height,
            tileset: tileset.as_ref().to_path_buf(),
            cell_w,
            cell_h,
            ..ConsoleConfig::default()
        })
    }

    pub fn with_config(config: ConsoleConfig) -> io::Result<Self> {
        let tileset = Tileset::load(&config.tileset, config.cell_w, config.cell_h)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        info!(
            "Loaded tileset {} ({}x{} tiles of {}x{} px)",
            config.tileset.display(),
            tileset.tiles_x,
            tileset.tiles_y,
            tileset.cell_w,
            tileset.cell_h
        );

        let renderer = CellRenderer::new(tileset, config.width, config.height);
        let window = open_window(&config, false)?;
        let (stream, beeper) = Beeper::open();
        let grid = GlyphGrid::new(config.width, config.height);

        Ok(Console {
            window,
            renderer,
            shared: Arc::new(Shared::new(grid, beeper)),
            fullscreen: false,
            force_redraw: true,
            _audio: stream,
            config,
        })
    }

    /// A handle for use from other threads. `start` passes one to the game
    /// closure; extra clones are fine.
    pub fn handle(&self) -> ConsoleHandle {
        ConsoleHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run `game` on its own thread while this thread drives the window.
    /// Returns the game's exit code once both sides have finished.
    pub fn start<F>(mut self, game: F) -> io::Result<i32>
    where
        F: FnOnce(ConsoleHandle) -> i32 + Send + 'static,
    {
        let handle = self.handle();
        let game_thread = thread::Builder::new()
            .name("game".to_string())
            .spawn(move || game(handle))?;

        let loop_result = self.run();

        // Whatever ended the loop, release a game thread blocked in
        // wait_key before joining it.
        self.shared.running.store(false, Ordering::Relaxed);
        self.shared.keys.close();

        let code = game_thread
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "game thread panicked"))?;
        loop_result?;

        info!("Game finished with exit code {}", code);
        Ok(code)
    }

    fn run(&mut self) -> io::Result<()> {
        let mut metrics = Metrics::new();
        let mut last_size = self.window.get_size();

        while self.window.is_open() && self.shared.running.load(Ordering::Relaxed) {
            if self.window.is_key_released(Key::F11) {
                self.toggle_fullscreen()?;
                last_size = self.window.get_size();
            }

            let mods = modifiers_down(&self.window);
            for key in self.window.get_keys_pressed(KeyRepeat::Yes) {
                self.shared.keys.push(KeyEvent { key, mods });
            }

            let size = self.window.get_size();
            let resized = size != last_size;
            last_size = size;

            let touched = self.shared.touched.swap(false, Ordering::Relaxed);
            if touched || resized || self.force_redraw {
                let redraw_all = resized || self.force_redraw;
                self.force_redraw = false;
                {
                    let mut grid = self.shared.lock_grid();
                    self.renderer
                        .draw(&mut grid, redraw_all, self.config.clear_dirty);
                }
                self.renderer.buffer().present(&mut self.window)?;
            } else {
                // Nothing to repaint; still pump the window so input and
                // close events keep flowing.
                self.window.update();
            }

            metrics.frame();
        }

        Ok(())
    }

    // minifb has no runtime fullscreen switch, so rebuild the window:
    // borderless and fit-to-screen for fullscreen, 2x windowed otherwise.
    fn toggle_fullscreen(&mut self) -> io::Result<()> {
        self.fullscreen = !self.fullscreen;
        info!("Fullscreen: {}", self.fullscreen);
        self.window = open_window(&self.config, self.fullscreen)?;
        self.force_redraw = true;
        Ok(())
    }
}

fn open_window(config: &ConsoleConfig, fullscreen: bool) -> io::Result<Window> {
    let opts = WindowOptions {
        resize: true,
        borderless: fullscreen,
        scale: if fullscreen { Scale::FitScreen } else { Scale::X2 },
        scale_mode: ScaleMode::Stretch,
        ..WindowOptions::default()
    };

    let mut window = Window::new(
        &config.title,
        config.width * config.cell_w,
        config.height * config.cell_h,
        opts,
    )
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    window.set_target_fps(config.target_fps);
    Ok(window)
}

fn modifiers_down(window: &Window) -> Modifiers {
    let mut mods = Modifiers::empty();
    if window.is_key_down(Key::LeftShift) || window.is_key_down(Key::RightShift) {
        mods |= Modifiers::SHIFT;
    }
    if window.is_key_down(Key::LeftCtrl) || window.is_key_down(Key::RightCtrl) {
        mods |= Modifiers::CTRL;
    }
    if window.is_key_down(Key::LeftAlt) || window.is_key_down(Key::RightAlt) {
        mods |= Modifiers::ALT;
    }
    if window.is_key_down(Key::LeftSuper) || window.is_key_down(Key::RightSuper) {
        mods |= Modifiers::SUPER;
    }
    mods
}

/// Game-thread view of a running console.
#[derive(Clone)]
pub struct ConsoleHandle {
    shared: Arc<Shared>,
}

impl ConsoleHandle {
    /// True once the console is shutting down; the game loop should wind up.
    pub fn should_quit(&self) -> bool {
        !self.shared.running.load(Ordering::Relaxed)
    }

    pub fn sleep(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }

    /// Oldest unread key press, if any.
    pub fn read_key(&self) -> Option<KeyEvent> {
        self.shared.keys.read()
    }

    /// Oldest unread key press, blocking until one arrives. Returns `None`
    /// once the console shuts down.
    pub fn wait_key(&self) -> Option<KeyEvent> {
        self.shared.keys.wait()
    }

    /// Write `text` at the cursor. The whole call holds the grid lock, so
    /// output from concurrent writers never interleaves mid-string.
    pub fn print(&self, fg: Color, bg: Color, text: &str) {
        self.shared.lock_grid().print(fg, bg, text);
        self.shared.touched.store(true, Ordering::Relaxed);
    }

    /// Write one cell directly.
    pub fn set(&self, x: usize, y: usize, code: u32, fg: Color, bg: Color) {
        self.shared.lock_grid().set(x, y, code, fg, bg);
        self.shared.touched.store(true, Ordering::Relaxed);
    }

    pub fn set_cursor(&self, x: usize, y: usize) {
        self.shared.lock_grid().set_cursor(x, y);
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.shared.lock_grid().cursor()
    }

    pub fn width(&self) -> usize {
        self.shared.lock_grid().width
    }

    pub fn height(&self) -> usize {
        self.shared.lock_grid().height
    }

    /// The default tone: 800 Hz for 200 ms. Blocks while it plays.
    pub fn beep(&self) {
        self.shared.beeper.beep();
    }

    /// Play a tone at `freq` Hz, blocking for `ms` milliseconds.
    pub fn beep_freq(&self, freq: u32, ms: u64) {
        self.shared.beeper.beep_freq(freq, ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handle(width: usize, height: usize) -> ConsoleHandle {
        ConsoleHandle {
            shared: Arc::new(Shared::new(GlyphGrid::new(width, height), Beeper::silent())),
        }
    }

    #[test]
    fn print_then_newline_print_moves_the_cursor() {
        let con = test_handle(10, 5);
        con.set_cursor(0, 0);
        con.print(Color::WHITE, Color::BLACK, "AB");
        assert_eq!(con.cursor(), (2, 0));

        con.print(Color::WHITE, Color::BLACK, "\nC");
        assert_eq!(con.cursor(), (1, 1));

        let grid = con.shared.lock_grid();
        assert_eq!(grid.cell(0, 0).code, 'A' as u32);
        assert_eq!(grid.cell(1, 0).code, 'B' as u32);
        assert_eq!(grid.cell(0, 1).code, 'C' as u32);
    }

    #[test]
    fn mutations_raise_the_wake_signal() {
        let con = test_handle(4, 4);
        con.shared.touched.store(false, Ordering::Relaxed);

        con.set(1, 1, '!' as u32, Color::WHITE, Color::BLACK);
        assert!(con.shared.touched.swap(false, Ordering::Relaxed));

        con.print(Color::WHITE, Color::BLACK, "x");
        assert!(con.shared.touched.load(Ordering::Relaxed));
    }

    #[test]
    fn shutdown_unblocks_wait_key_and_flags_quit() {
        let con = test_handle(4, 4);
        assert!(!con.should_quit());

        let waiter = con.clone();
        let join = thread::spawn(move || waiter.wait_key());

        thread::sleep(Duration::from_millis(50));
        con.shared.running.store(false, Ordering::Relaxed);
        con.shared.keys.close();

        assert_eq!(join.join().unwrap(), None);
        assert!(con.should_quit());
    }

    #[test]
    fn concurrent_prints_never_tear_a_cell() {
        let con = test_handle(8, 8);
        // Each writer uses its own (code, fg, bg) triple; afterwards every
        // cell must hold one writer's triple in full.
        let palettes = [
            ('a', Color::RED, Color::BLACK),
            ('b', Color::GREEN, Color::BLUE),
            ('c', Color::YELLOW, Color::MAGENTA),
        ];

        let writers: Vec<_> = palettes
            .iter()
            .map(|&(ch, fg, bg)| {
                let con = con.clone();
                let text: String = std::iter::repeat(ch).take(64).collect();
                thread::spawn(move || {
                    for _ in 0..50 {
                        con.print(fg, bg, &text);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let grid = con.shared.lock_grid();
        for cell in &grid.cells {
            assert!(palettes
                .iter()
                .any(|&(ch, fg, bg)| cell.code == ch as u32 && cell.fg == fg && cell.bg == bg));
        }
    }
}
