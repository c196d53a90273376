//! The in-memory raster.
//!
//! A [`Raster`] is a packed, bottom-up bitmap: storage row 0 is the visual bottom row and every
//! row is padded to a multiple of four bytes. Indexed rasters (1, 4 or 8 bits per pixel) own a
//! [`Palette`] of exactly `2^depth` entries; 24-bit rasters store blue, green, red byte triples
//! and have no palette.
//!
//! Pixel accessors take visual coordinates (`y = 0` is the top row) and translate them to
//! storage rows. Code that works on whole storage rows goes through [`Raster::row`] and
//! [`RowCursor`](rows::RowCursor).

mod palette;
pub(crate) mod rows;
mod view;

pub use self::palette::{Palette, MAX_PALETTE_LEN};
pub use self::rows::{Interlace, RowCursor};
pub use self::view::RasterView;

use crate::color::Color;
use crate::error::{
    ImageError, ImageResult, LimitErrorKind, ParameterErrorKind, UnsupportedError,
    UnsupportedErrorKind,
};
use crate::io::Limits;

/// Hard ceiling on the pixel buffer of a single raster, in bytes.
pub const MAX_RASTER_BYTES: usize = 256 * 1024 * 1024;

/// Supported pixel layouts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BitDepth {
    /// Eight palette indices per byte, most significant bit first.
    One,
    /// Two palette indices per byte, high nibble first.
    Four,
    /// One palette index per byte.
    Eight,
    /// Blue, green, red bytes, no palette.
    TwentyFour,
}

impl BitDepth {
    /// Bits per pixel.
    #[must_use]
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::One => 1,
            BitDepth::Four => 4,
            BitDepth::Eight => 8,
            BitDepth::TwentyFour => 24,
        }
    }

    /// The smallest indexed depth able to address `colors` palette entries.
    #[must_use]
    pub fn for_colors(colors: usize) -> BitDepth {
        match colors {
            0..=2 => BitDepth::One,
            3..=16 => BitDepth::Four,
            _ => BitDepth::Eight,
        }
    }

    /// Whether pixels are palette indices.
    #[must_use]
    pub fn is_indexed(self) -> bool {
        self != BitDepth::TwentyFour
    }

    /// Number of palette entries a raster of this depth carries.
    #[must_use]
    pub fn palette_len(self) -> usize {
        match self {
            BitDepth::TwentyFour => 0,
            depth => 1 << depth.bits(),
        }
    }

    /// Bytes per word-aligned row of `width` pixels, if it fits in `usize`.
    #[must_use]
    pub fn row_stride(self, width: u32) -> Option<usize> {
        let bits = u64::from(self.bits()).checked_mul(u64::from(width))?;
        let words = bits.checked_add(31)? / 32;
        usize::try_from(words.checked_mul(4)?).ok()
    }
}

/// The transparency marker consulted by the GIF graphic control extension.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Transparency {
    /// Every pixel is opaque.
    #[default]
    None,
    /// Pixels with this palette index are transparent.
    Index(u8),
    /// Pixels with this color are transparent.
    Color(Color),
}

/// A bit-depth-aware pixel store and the exclusive owner of its pixel bytes and palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    depth: BitDepth,
    stride: usize,
    pixels: Vec<u8>,
    palette: Option<Palette>,
    transparency: Transparency,
    background: u8,
}

impl Raster {
    /// Allocates a zeroed raster with a black palette.
    ///
    /// Fails with a parameter error for a zero width or height and with a limit error when the
    /// buffer would exceed [`MAX_RASTER_BYTES`]; nothing is allocated in either case.
    pub fn new(width: u32, height: u32, depth: BitDepth) -> ImageResult<Raster> {
        let size = Raster::buffer_size(width, height, depth)?;
        let stride = size / height as usize;
        Ok(Raster {
            width,
            height,
            depth,
            stride,
            pixels: vec![0; size],
            palette: depth
                .is_indexed()
                .then(|| Palette::new(depth.palette_len())),
            transparency: Transparency::None,
            background: 0,
        })
    }

    /// Same as [`Raster::new`], but checks `limits` first and charges the allocation to its
    /// budget.
    pub fn with_limits(
        width: u32,
        height: u32,
        depth: BitDepth,
        limits: &mut Limits,
    ) -> ImageResult<Raster> {
        limits.check_dimensions(width, height)?;
        let size = Raster::buffer_size(width, height, depth)?;
        limits.reserve_usize(size)?;
        Raster::new(width, height, depth)
    }

    /// Size in bytes of the pixel buffer for the given geometry.
    pub fn buffer_size(width: u32, height: u32, depth: BitDepth) -> ImageResult<usize> {
        if width == 0 || height == 0 {
            return Err(ImageError::parameter(ParameterErrorKind::DimensionMismatch));
        }
        depth
            .row_stride(width)
            .and_then(|stride| stride.checked_mul(height as usize))
            .filter(|&size| size <= MAX_RASTER_BYTES)
            .ok_or_else(|| ImageError::limits(LimitErrorKind::InsufficientMemory))
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

    /// Bytes per storage row, a multiple of four.
    #[must_use]
    pub fn row_stride(&self) -> usize {
        self.stride
    }

    /// The whole pixel buffer, bottom row first.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable access to the whole pixel buffer, bottom row first.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Storage row `row` (0 is the visual bottom row).
    ///
    /// # Panics
    ///
    /// Panics if `row >= height`.
    #[must_use]
    pub fn row(&self, row: u32) -> &[u8] {
        let start = row as usize * self.stride;
        &self.pixels[start..start + self.stride]
    }

    /// Mutable storage row `row` (0 is the visual bottom row).
    ///
    /// # Panics
    ///
    /// Panics if `row >= height`.
    pub fn row_mut(&mut self, row: u32) -> &mut [u8] {
        let start = row as usize * self.stride;
        &mut self.pixels[start..start + self.stride]
    }

    /// The palette of an indexed raster.
    #[must_use]
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Mutable palette of an indexed raster.
    pub fn palette_mut(&mut self) -> Option<&mut Palette> {
        self.palette.as_mut()
    }

    /// The transparency marker.
    #[must_use]
    pub fn transparency(&self) -> Transparency {
        self.transparency
    }

    /// Sets the transparency marker.
    pub fn set_transparency(&mut self, transparency: Transparency) {
        self.transparency = transparency;
    }

    /// Palette index used as the logical screen background.
    #[must_use]
    pub fn background_index(&self) -> u8 {
        self.background
    }

    /// Sets the palette index used as the logical screen background.
    pub fn set_background_index(&mut self, index: u8) {
        self.background = index;
    }

    /// Borrows the raster as a read-only view.
    #[must_use]
    pub fn view(&self) -> RasterView<'_> {
        RasterView::new(
            self.width,
            self.height,
            self.depth,
            self.stride,
            &self.pixels,
            self.palette.as_ref(),
            self.transparency,
            self.background,
        )
    }

    #[inline]
    fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    fn storage_row(&self, y: u32) -> u32 {
        self.height - 1 - y
    }

    /// Palette index at visual position (`x`, `y`). See [`RasterView::get_index`].
    #[must_use]
    pub fn get_index(&self, x: u32, y: u32) -> u8 {
        self.view().get_index(x, y)
    }

    /// Color at visual position (`x`, `y`). See [`RasterView::get_color`].
    #[must_use]
    pub fn get_color(&self, x: u32, y: u32) -> Color {
        self.view().get_color(x, y)
    }

    /// Stores palette index `index` at visual position (`x`, `y`).
    ///
    /// Only the bits belonging to the pixel are touched; the index is masked to the depth.
    /// Out-of-bounds positions and 24-bit rasters are ignored.
    pub fn set_index(&mut self, x: u32, y: u32, index: u8) {
        if !self.contains(x, y) || !self.depth.is_indexed() {
            return;
        }
        let row = self.storage_row(y);
        pack_index(self.depth, self.row_mut(row), x as usize, index);
    }

    /// Stores `color` at visual position (`x`, `y`).
    ///
    /// Indexed rasters store the nearest palette entry.
    pub fn set_color(&mut self, x: u32, y: u32, color: Color) {
        if !self.contains(x, y) {
            return;
        }
        match self.depth {
            BitDepth::TwentyFour => {
                let row = self.storage_row(y);
                let offset = x as usize * 3;
                self.row_mut(row)[offset..offset + 3].copy_from_slice(&[color.b, color.g, color.r]);
            }
            _ => {
                let index = self
                    .palette
                    .as_ref()
                    .map_or(0, |palette| palette.nearest_index(color));
                self.set_index(x, y, index);
            }
        }
    }

    /// Packs `indices` into storage row `row`, starting at column 0.
    ///
    /// Extra indices beyond the width are ignored.
    pub fn write_row_indices(&mut self, row: u32, indices: &[u8]) {
        let depth = self.depth;
        let width = self.width as usize;
        let dest = self.row_mut(row);
        match depth {
            BitDepth::Eight => {
                let n = width.min(indices.len());
                dest[..n].copy_from_slice(&indices[..n]);
            }
            BitDepth::TwentyFour => {}
            _ => {
                for (x, &index) in indices.iter().take(width).enumerate() {
                    pack_index(depth, dest, x, index);
                }
            }
        }
    }

    /// Sets every pixel of an indexed raster to `index`.
    pub fn fill_index(&mut self, index: u8) {
        let byte = match self.depth {
            BitDepth::One => {
                if index & 1 == 1 {
                    0xFF
                } else {
                    0
                }
            }
            BitDepth::Four => (index & 0x0F) * 0x11,
            BitDepth::Eight => index,
            BitDepth::TwentyFour => return,
        };
        self.pixels.fill(byte);
    }

    /// Returns a copy of an indexed raster promoted to the wider depth `depth`.
    ///
    /// Between indexed depths palette indices are preserved and the palette is extended with
    /// black entries. Promotion to 24 bits resolves every pixel through the palette and turns an
    /// index transparency into a color one. The copy is a fresh allocation; the receiver is left
    /// untouched.
    pub fn increase_bit_depth(&self, depth: BitDepth) -> ImageResult<Raster> {
        if depth < self.depth {
            return Err(ImageError::Unsupported(UnsupportedError::from_kind(
                UnsupportedErrorKind::BitDepth(depth.bits()),
            )));
        }
        if depth == self.depth {
            return Ok(self.clone());
        }

        let mut target = Raster::new(self.width, self.height, depth)?;
        target.background = self.background;

        if depth == BitDepth::TwentyFour {
            let view = self.view();
            target.transparency = match self.transparency {
                Transparency::Index(index) => self
                    .palette
                    .as_ref()
                    .and_then(|palette| palette.get(index))
                    .map_or(Transparency::None, Transparency::Color),
                other => other,
            };
            for y in 0..self.height {
                for x in 0..self.width {
                    target.set_color(x, y, view.get_color(x, y));
                }
            }
            return Ok(target);
        }

        if let (Some(src), Some(dst)) = (self.palette.as_ref(), target.palette.as_mut()) {
            dst.copy_from(src.as_slice());
        }
        target.transparency = self.transparency;

        let view = self.view();
        let mut indices = vec![0; self.width as usize];
        for row in 0..self.height {
            view.read_row_indices(row, &mut indices);
            target.write_row_indices(row, &indices);
        }
        Ok(target)
    }
}

/// Writes one palette index into a packed row without disturbing its neighbours.
#[inline]
pub(crate) fn pack_index(depth: BitDepth, row: &mut [u8], x: usize, index: u8) {
    match depth {
        BitDepth::One => {
            let shift = 7 - (x % 8);
            let byte = &mut row[x / 8];
            *byte = (*byte & !(1 << shift)) | ((index & 1) << shift);
        }
        BitDepth::Four => {
            let shift = 4 * (1 - (x % 2));
            let byte = &mut row[x / 2];
            *byte = (*byte & !(0x0F << shift)) | ((index & 0x0F) << shift);
        }
        BitDepth::Eight => row[x] = index,
        BitDepth::TwentyFour => {}
    }
}

/// Reads one palette index out of a packed row.
#[inline]
pub(crate) fn unpack_index(depth: BitDepth, row: &[u8], x: usize) -> u8 {
    match depth {
        BitDepth::One => (row[x / 8] >> (7 - (x % 8))) & 1,
        BitDepth::Four => (row[x / 2] >> (4 * (1 - (x % 2)))) & 0x0F,
        BitDepth::Eight => row[x],
        BitDepth::TwentyFour => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_word_aligned() {
        assert_eq!(BitDepth::One.row_stride(1), Some(4));
        assert_eq!(BitDepth::One.row_stride(33), Some(8));
        assert_eq!(BitDepth::Four.row_stride(9), Some(8));
        assert_eq!(BitDepth::Eight.row_stride(5), Some(8));
        assert_eq!(BitDepth::TwentyFour.row_stride(3), Some(12));
        assert_eq!(BitDepth::TwentyFour.row_stride(5), Some(16));
    }

    #[test]
    fn new_allocates_palette_by_depth() {
        let r = Raster::new(3, 2, BitDepth::Four).unwrap();
        assert_eq!(r.pixels().len(), 8);
        assert_eq!(r.palette().map(Palette::len), Some(16));
        assert!(r.palette().unwrap().as_slice().iter().all(|c| *c == Color::BLACK));

        let r = Raster::new(3, 2, BitDepth::TwentyFour).unwrap();
        assert!(r.palette().is_none());
        assert_eq!(r.pixels().len(), 24);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            Raster::new(0, 10, BitDepth::Eight),
            Err(ImageError::Parameter(_))
        ));
        assert!(matches!(
            Raster::new(10, 0, BitDepth::Eight),
            Err(ImageError::Parameter(_))
        ));
    }

    #[test]
    fn ceiling_is_enforced_before_allocation() {
        assert!(matches!(
            Raster::new(u32::MAX, u32::MAX, BitDepth::TwentyFour),
            Err(ImageError::Limits(_))
        ));
        assert!(matches!(
            Raster::new(16384, 16385, BitDepth::Eight),
            Err(ImageError::Limits(_))
        ));
    }

    #[test]
    fn limits_budget_is_charged() {
        let mut limits = Limits::no_limits();
        limits.max_alloc = Some(100);
        assert!(Raster::with_limits(10, 10, BitDepth::Eight, &mut limits).is_err());
        assert!(Raster::with_limits(4, 10, BitDepth::Eight, &mut limits).is_ok());
        assert_eq!(limits.max_alloc, Some(60));
    }

    #[test]
    fn one_bit_packing_keeps_neighbours() {
        let mut r = Raster::new(16, 2, BitDepth::One).unwrap();
        r.row_mut(1)[0] = 0b1010_0101;
        // visual row 0 is storage row 1
        r.set_index(1, 0, 1);
        assert_eq!(r.get_index(1, 0), 1);
        assert_eq!(r.row(1)[0], 0b1110_0101);
        r.set_index(0, 0, 0);
        assert_eq!(r.row(1)[0], 0b0110_0101);
        r.set_index(7, 0, 0);
        assert_eq!(r.row(1)[0], 0b0110_0100);
        assert_eq!(r.row(0)[0], 0);
    }

    #[test]
    fn four_bit_packing_keeps_neighbours() {
        let mut r = Raster::new(4, 1, BitDepth::Four).unwrap();
        r.set_index(0, 0, 0x3);
        r.set_index(1, 0, 0xC);
        r.set_index(2, 0, 0x7);
        assert_eq!(r.row(0)[0], 0x3C);
        assert_eq!(r.row(0)[1], 0x70);
        r.set_index(1, 0, 0x1F);
        assert_eq!(r.row(0)[0], 0x3F);
        assert_eq!(r.get_index(0, 0), 0x3);
        assert_eq!(r.get_index(1, 0), 0xF);
    }

    #[test]
    fn accessors_are_top_down() {
        let mut r = Raster::new(2, 3, BitDepth::Eight).unwrap();
        r.set_index(1, 0, 9);
        assert_eq!(r.row(2)[1], 9);
        assert_eq!(r.get_index(1, 0), 9);
    }

    #[test]
    fn true_color_is_bgr() {
        let mut r = Raster::new(2, 1, BitDepth::TwentyFour).unwrap();
        r.set_color(1, 0, Color::rgb(1, 2, 3));
        assert_eq!(&r.row(0)[3..6], &[3, 2, 1]);
        assert_eq!(r.get_color(1, 0), Color::rgb(1, 2, 3));
    }

    #[test]
    fn set_color_uses_nearest_entry() {
        let mut r = Raster::new(2, 2, BitDepth::One).unwrap();
        r.palette_mut().unwrap().set(1, Color::WHITE);
        r.set_color(0, 1, Color::rgb(200, 210, 220));
        assert_eq!(r.get_index(0, 1), 1);
        assert_eq!(r.get_color(0, 1), Color::WHITE);
    }

    #[test]
    fn out_of_bounds_reads() {
        let mut r = Raster::new(2, 2, BitDepth::Eight).unwrap();
        r.set_index(0, 0, 5);
        assert_eq!(r.get_index(7, 7), 5);
        r.set_transparency(Transparency::Index(3));
        assert_eq!(r.get_index(7, 7), 3);

        r.palette_mut().unwrap().set(3, Color::rgb(9, 9, 9));
        assert_eq!(r.get_color(2, 0), Color::rgb(9, 9, 9));

        r.set_transparency(Transparency::Color(Color::rgb(1, 1, 1)));
        assert_eq!(r.get_color(0, 2), Color::rgb(1, 1, 1));

        // writes outside are ignored
        r.set_index(2, 2, 1);
        assert_eq!(r.get_index(0, 0), 5);
    }

    #[test]
    fn fill_and_promote() {
        let mut r = Raster::new(5, 2, BitDepth::One).unwrap();
        r.palette_mut().unwrap().set(1, Color::WHITE);
        r.fill_index(1);
        r.set_index(2, 1, 0);

        let wide = r.increase_bit_depth(BitDepth::Eight).unwrap();
        assert_eq!(wide.bit_depth(), BitDepth::Eight);
        assert_eq!(wide.palette().unwrap().len(), 256);
        assert_eq!(wide.palette().unwrap()[1], Color::WHITE);
        for y in 0..2 {
            for x in 0..5 {
                assert_eq!(wide.get_index(x, y), r.get_index(x, y));
            }
        }
        assert!(wide.increase_bit_depth(BitDepth::Four).is_err());

        r.set_transparency(Transparency::Index(0));
        let rgb = r.increase_bit_depth(BitDepth::TwentyFour).unwrap();
        assert!(rgb.palette().is_none());
        assert_eq!(rgb.get_color(0, 0), Color::WHITE);
        assert_eq!(rgb.get_color(2, 1), Color::BLACK);
        assert_eq!(rgb.transparency(), Transparency::Color(Color::BLACK));
    }
}
