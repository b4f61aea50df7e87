pub mod color;
pub mod glyph;
pub mod grid;
pub mod tileset;

pub use color::Color;
pub use glyph::Glyph;
pub use grid::GlyphGrid;
pub use tileset::Tileset;
