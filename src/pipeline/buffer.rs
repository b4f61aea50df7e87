use std::io;

use minifb::Window;
use rayon::iter::ParallelIterator;
use rayon::slice::ParallelSliceMut;

/// Off-screen pixel target the glyph grid is rasterized into, one `u32` per
/// pixel in minifb's 0x00RRGGBB layout.
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn clear(&mut self) {
        self.data.par_chunks_mut(1024).for_each(|chunk| {
            for point in chunk {
                *point = 0;
            }
        });
    }

    /// Blit the whole buffer to the window; minifb scales it to the current
    /// window size.
    pub fn present(&self, window: &mut Window) -> io::Result<()> {
        window
            .update_with_buffer(&self.data, self.width, self.height)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_every_pixel() {
        let mut buffer = FrameBuffer::new(64, 33);
        buffer.data.fill(0xDEADBEEF);
        buffer.clear();
        assert!(buffer.data.iter().all(|&p| p == 0));
    }
}
