use crate::color::Color;
use crate::raster::{unpack_index, BitDepth, Palette, Transparency};

/// A read-only borrow of a raster's pixels, palette and transparency.
///
/// The encoder reads through a view so a caller can hand out a raster without giving up
/// ownership of it. A view never outlives the raster it was taken from.
#[derive(Copy, Clone, Debug)]
pub struct RasterView<'a> {
    width: u32,
    height: u32,
    depth: BitDepth,
    stride: usize,
    pixels: &'a [u8],
    palette: Option<&'a Palette>,
    transparency: Transparency,
    background: u8,
}

impl<'a> RasterView<'a> {
    pub(crate) fn new(
        width: u32,
        height: u32,
        depth: BitDepth,
        stride: usize,
        pixels: &'a [u8],
        palette: Option<&'a Palette>,
        transparency: Transparency,
        background: u8,
    ) -> Self {
        RasterView {
            width,
            height,
            depth,
            stride,
            pixels,
            palette,
            transparency,
            background,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixel layout.
    #[must_use]
    pub fn bit_depth(&self) -> BitDepth {
        self.depth
    }

    /// The palette, for indexed rasters.
    #[must_use]
    pub fn palette(&self) -> Option<&'a Palette> {
        self.palette
    }

    /// The transparency marker.
    #[must_use]
    pub fn transparency(&self) -> Transparency {
        self.transparency
    }

    /// Palette index used as the logical screen background.
    #[must_use]
    pub fn background_index(&self) -> u8 {
        self.background
    }

    /// Storage row `row`, 0 being the visual bottom row.
    #[must_use]
    pub fn row(&self, row: u32) -> &'a [u8] {
        let start = row as usize * self.stride;
        &self.pixels[start..start + self.stride]
    }

    /// Unpacks the palette indices of storage row `row` into `out`.
    ///
    /// At most `min(width, out.len())` indices are written.
    pub fn read_row_indices(&self, row: u32, out: &mut [u8]) {
        let src = self.row(row);
        let n = out.len().min(self.width as usize);
        match self.depth {
            BitDepth::Eight => out[..n].copy_from_slice(&src[..n]),
            depth => {
                for (x, slot) in out[..n].iter_mut().enumerate() {
                    *slot = unpack_index(depth, src, x);
                }
            }
        }
    }

    /// Palette index at visual position (`x`, `y`), `y = 0` being the top row.
    ///
    /// Outside the raster this returns the transparent index if one is set and the index at
    /// (0, 0) otherwise. True-color rasters always answer 0.
    #[must_use]
    pub fn get_index(&self, x: u32, y: u32) -> u8 {
        if !self.depth.is_indexed() {
            return 0;
        }
        if x >= self.width || y >= self.height {
            return match self.transparency {
                Transparency::Index(index) => index,
                _ => self.get_index(0, 0),
            };
        }
        let row = self.row(self.height - 1 - y);
        unpack_index(self.depth, row, x as usize)
    }

    /// Color at visual position (`x`, `y`), `y = 0` being the top row.
    ///
    /// Outside the raster this returns the transparent color if one is set and the color at
    /// (0, 0) otherwise.
    #[must_use]
    pub fn get_color(&self, x: u32, y: u32) -> Color {
        if x >= self.width || y >= self.height {
            return match self.transparency {
                Transparency::Index(index) => self.palette_color(index),
                Transparency::Color(color) => color,
                Transparency::None => self.get_color(0, 0),
            };
        }
        match self.depth {
            BitDepth::TwentyFour => {
                let row = self.row(self.height - 1 - y);
                let offset = x as usize * 3;
                Color::rgb(row[offset + 2], row[offset + 1], row[offset])
            }
            _ => self.palette_color(self.get_index(x, y)),
        }
    }

    fn palette_color(&self, index: u8) -> Color {
        self.palette
            .and_then(|palette| palette.get(index))
            .unwrap_or_default()
    }
}
