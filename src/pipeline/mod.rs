use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

use crate::core::color::Color;
use crate::core::glyph::Glyph;
use crate::core::grid::GlyphGrid;
use crate::core::tileset::Tileset;

pub mod buffer;
pub use buffer::FrameBuffer;

/// Rasterizes a glyph grid into a pixel framebuffer through a tileset.
///
/// Each cell is drawn as a background fill with the foreground-modulated
/// tile blended on top, the same compositing a color-modded texture copy
/// over a filled rect produces. Grid rows map to disjoint horizontal pixel
/// bands, so rows rasterize in parallel.
pub struct CellRenderer {
    tileset: Tileset,
    cell_w: usize,
    cell_h: usize,
    buffer: FrameBuffer,
}

impl CellRenderer {
    pub fn new(tileset: Tileset, grid_w: usize, grid_h: usize) -> Self {
        let cell_w = tileset.cell_w as usize;
        let cell_h = tileset.cell_h as usize;
        CellRenderer {
            buffer: FrameBuffer::new(grid_w * cell_w, grid_h * cell_h),
            tileset,
            cell_w,
            cell_h,
        }
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Redraw every dirty cell, or every cell when `redraw_all` is set
    /// (window resize/restore). `clear_dirty` resets flags after drawing;
    /// leaving it off keeps the legacy semantics where flags stay set and
    /// marked cells repaint on every pass.
    pub fn draw(&mut self, grid: &mut GlyphGrid, redraw_all: bool, clear_dirty: bool) {
        let band = self.buffer.width * self.cell_h;
        let stride = self.buffer.width;
        let (cell_w, cell_h) = (self.cell_w, self.cell_h);
        let tileset = &self.tileset;

        self.buffer
            .data
            .par_chunks_mut(band)
            .zip(grid.cells.par_chunks_mut(grid.width))
            .for_each(|(pixels, row)| {
                for (x, glyph) in row.iter_mut().enumerate() {
                    if glyph.dirty || redraw_all {
                        draw_cell(pixels, stride, x * cell_w, tileset, glyph, cell_w, cell_h);
                    }
                    if clear_dirty {
                        glyph.dirty = false;
                    }
                }
            });
    }
}

fn draw_cell(
    pixels: &mut [u32],
    stride: usize,
    x0: usize,
    tileset: &Tileset,
    glyph: &Glyph,
    cell_w: usize,
    cell_h: usize,
) {
    let origin = tileset.origin(glyph.code);
    for dy in 0..cell_h {
        let row = &mut pixels[dy * stride + x0..dy * stride + x0 + cell_w];
        for (dx, out) in row.iter_mut().enumerate() {
            let [r, g, b, a] = tileset.texel(origin, dx as u32, dy as u32);
            let src = Color::new(r, g, b).modulate(glyph.fg);
            *out = Color::blend(src, glyph.bg, a).to_u32();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    // Two 2x2 tiles side by side: tile 0 fully transparent (background shows
    // through), tile 1 opaque white (foreground shows).
    fn test_tileset() -> Tileset {
        let img = RgbaImage::from_fn(4, 2, |x, _y| {
            if x < 2 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        Tileset::from_image(img, 2, 2).unwrap()
    }

    fn pixel(renderer: &CellRenderer, x: usize, y: usize) -> u32 {
        renderer.buffer().data[x + y * renderer.buffer().width]
    }

    #[test]
    fn transparent_tile_shows_background() {
        let mut grid = GlyphGrid::new(2, 1);
        let mut renderer = CellRenderer::new(test_tileset(), 2, 1);
        grid.set(0, 0, 0, Color::RED, Color::BLUE);
        renderer.draw(&mut grid, false, false);

        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(pixel(&renderer, x, y), Color::BLUE.to_u32());
            }
        }
    }

    #[test]
    fn opaque_tile_shows_modulated_foreground() {
        let mut grid = GlyphGrid::new(2, 1);
        let mut renderer = CellRenderer::new(test_tileset(), 2, 1);
        grid.set(1, 0, 1, Color::RED, Color::BLUE);
        renderer.draw(&mut grid, false, false);

        for y in 0..2 {
            for x in 2..4 {
                assert_eq!(pixel(&renderer, x, y), Color::RED.to_u32());
            }
        }
    }

    #[test]
    fn clean_cells_are_skipped() {
        let mut grid = GlyphGrid::new(2, 1);
        let mut renderer = CellRenderer::new(test_tileset(), 2, 1);
        renderer.draw(&mut grid, false, true);
        assert!(grid.cells.iter().all(|c| !c.dirty));

        // Mutate a cell behind the dirty flag's back; a plain pass must not
        // pick it up, a full redraw must.
        grid.cells[1].code = 1;
        grid.cells[1].fg = Color::GREEN;
        renderer.draw(&mut grid, false, true);
        assert_eq!(pixel(&renderer, 2, 0), Color::BLACK.to_u32());

        renderer.draw(&mut grid, true, true);
        assert_eq!(pixel(&renderer, 2, 0), Color::GREEN.to_u32());
    }

    #[test]
    fn default_policy_keeps_dirty_flags_set() {
        let mut grid = GlyphGrid::new(2, 1);
        let mut renderer = CellRenderer::new(test_tileset(), 2, 1);
        renderer.draw(&mut grid, false, false);
        assert!(grid.cells.iter().all(|c| c.dirty));
    }
}
