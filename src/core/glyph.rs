use crate::core::color::Color;

/// One grid cell: a tileset index plus its colors and a dirty marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyph {
    pub code: u32,
    pub fg: Color,
    pub bg: Color,
    pub dirty: bool,
}

impl Glyph {
    pub fn new(code: u32, fg: Color, bg: Color) -> Self {
        Self {
            code,
            fg,
            bg,
            dirty: true,
        }
    }

    pub fn blank() -> Self {
        Self::new(' ' as u32, Color::WHITE, Color::BLACK)
    }

    /// Replace all three visible fields as one unit and mark the cell dirty.
    pub fn write(&mut self, code: u32, fg: Color, bg: Color) {
        self.code = code;
        self.fg = fg;
        self.bg = bg;
        self.dirty = true;
    }
}

impl Default for Glyph {
    fn default() -> Self {
        Self::blank()
    }
}
