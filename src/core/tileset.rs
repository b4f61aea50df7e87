use std::path::Path;

use glam::UVec2;
use image::RgbaImage;

/// A bitmap font atlas. Glyph codes index tiles in row-major order; the tile
/// layout is derived from the image dimensions divided by the cell size.
pub struct Tileset {
    image: RgbaImage,
    pub cell_w: u32,
    pub cell_h: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl Tileset {
    /// Load a tileset from an image file.
    pub fn load(path: &Path, cell_w: usize, cell_h: usize) -> Result<Self, String> {
        let img = image::open(path)
            .map_err(|e| format!("Failed to load tileset '{}': {}", path.display(), e))?;
        Self::from_image(img.to_rgba8(), cell_w, cell_h)
    }

    pub fn from_image(image: RgbaImage, cell_w: usize, cell_h: usize) -> Result<Self, String> {
        if cell_w == 0 || cell_h == 0 {
            return Err("Tileset cell dimensions must be non-zero".to_string());
        }
        let tiles_x = image.width() / cell_w as u32;
        let tiles_y = image.height() / cell_h as u32;
        if tiles_x == 0 || tiles_y == 0 {
            return Err(format!(
                "Tileset image {}x{} is smaller than one {}x{} cell",
                image.width(),
                image.height(),
                cell_w,
                cell_h
            ));
        }

        Ok(Tileset {
            image,
            cell_w: cell_w as u32,
            cell_h: cell_h as u32,
            tiles_x,
            tiles_y,
        })
    }

    pub fn tile_count(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    /// Top-left pixel of the tile for `code`. Codes past the last tile wrap
    /// around the atlas.
    pub fn origin(&self, code: u32) -> UVec2 {
        let code = code % self.tile_count();
        let tx = code % self.tiles_x;
        let ty = code / self.tiles_x;
        UVec2::new(tx * self.cell_w, ty * self.cell_h)
    }

    /// RGBA texel at `origin + (dx, dy)`. Alpha is the glyph coverage mask.
    pub fn texel(&self, origin: UVec2, dx: u32, dy: u32) -> [u8; 4] {
        self.image.get_pixel(origin.x + dx, origin.y + dy).0
    }
}
