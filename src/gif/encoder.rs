use std::collections::HashMap;
use std::io::Write;
use std::{error, fmt};

use byteorder_lite::{LittleEndian, WriteBytesExt};

use super::bits::SubBlockWriter;
use super::compress::compress;
use super::lzw::HashTable;
use super::{
    Block, Compression, DisposalMethod, Extension, GraphicControl, ImageDescriptor, Repeat,
    ScreenDescriptor, NETSCAPE,
};
use crate::animation::Frame;
use crate::color::{same_table, Color};
use crate::error::{EncodingError, ImageError, ImageResult, ParameterErrorKind};
use crate::raster::{
    rows, BitDepth, Raster, RasterView, RowCursor, Transparency, MAX_PALETTE_LEN,
};

/// Cell size used to split a true-color image with more than 256 colors. A cell holds at most
/// 255 pixels, so its colors always fit beside the transparent slot 0.
const CELL_WIDTH: u32 = 17;
const CELL_HEIGHT: u32 = 15;

#[derive(Debug)]
enum EncoderError {
    /// A frame or the logical screen does not fit the 16-bit descriptor fields.
    DimensionsTooLarge { width: u32, height: u32 },
    /// A frame offset does not fit the 16-bit descriptor fields.
    OffsetTooLarge { left: u32, top: u32 },
}

impl fmt::Display for EncoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderError::DimensionsTooLarge { width, height } => f.write_fmt(format_args!(
                "{width}x{height} exceeds the 65535x65535 limit of the GIF format"
            )),
            EncoderError::OffsetTooLarge { left, top } => f.write_fmt(format_args!(
                "Frame offset ({left}, {top}) exceeds the 65535 limit of the GIF format"
            )),
        }
    }
}

impl From<EncoderError> for ImageError {
    fn from(e: EncoderError) -> ImageError {
        ImageError::Encoding(EncodingError::new(e))
    }
}

impl error::Error for EncoderError {}

/// One image block, ready to be written.
#[derive(Debug)]
struct IndexedFrame {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    /// Color table, its length a power of two.
    colors: Vec<Color>,
    control: GraphicControl,
    /// Palette indices in wire order.
    indices: Vec<u8>,
}

impl IndexedFrame {
    /// Size exponent of the color table.
    fn table_size(&self) -> u8 {
        (self.colors.len().trailing_zeros() as u8).saturating_sub(1)
    }

    /// Minimum code size of the pixel stream.
    fn min_code_size(&self) -> u8 {
        (self.colors.len().trailing_zeros() as u8).max(2)
    }
}

/// GIF encoder.
///
/// Writes a complete stream for every call to one of the `encode` methods. The LZW hash table
/// is owned by the encoder and reused for every image block it writes.
pub struct GifEncoder<W: Write> {
    w: W,
    compression: Compression,
    repeat: Repeat,
    comment: Option<String>,
    interlaced: bool,
    table: HashTable,
}

impl<W: Write> GifEncoder<W> {
    /// Creates a new GIF encoder with LZW compression.
    pub fn new(w: W) -> GifEncoder<W> {
        GifEncoder {
            w,
            compression: Compression::default(),
            repeat: Repeat::Finite(0),
            comment: None,
            interlaced: false,
            table: HashTable::new(),
        }
    }

    /// Selects the body compressor.
    pub fn set_compression(&mut self, compression: Compression) {
        self.compression = compression;
    }

    /// Set the repeat behaviour of the encoded GIF.
    ///
    /// `Repeat::Finite(0)` omits the looping extension.
    pub fn set_repeat(&mut self, repeat: Repeat) {
        self.repeat = repeat;
    }

    /// Writes a comment extension after the logical screen.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    /// Transmits rows in the four-pass interlaced order.
    pub fn set_interlaced(&mut self, interlaced: bool) {
        self.interlaced = interlaced;
    }

    /// Encode a single raster.
    pub fn encode(&mut self, raster: &Raster) -> ImageResult<()> {
        self.encode_view(raster.view())
    }

    /// Encode a borrowed raster.
    pub fn encode_view(&mut self, view: RasterView<'_>) -> ImageResult<()> {
        let blocks = self.index_frame(view, 0, 0, 0, DisposalMethod::Unspecified)?;
        self.write_stream(&blocks, view.background_index())
    }

    /// Encodes Frames.
    /// Consider using `try_encode_frames` instead to encode an `animation::Frames` like iterator.
    pub fn encode_frames<F>(&mut self, frames: F) -> ImageResult<()>
    where
        F: IntoIterator<Item = Frame>,
    {
        self.try_encode_frames(frames.into_iter().map(Ok))
    }

    /// Try to encode a collection of `ImageResult<animation::Frame>` objects.
    /// Use this function to encode an `animation::Frames` like iterator.
    /// Whenever an `Err` item is encountered, that value is returned without further actions.
    pub fn try_encode_frames<F>(&mut self, frames: F) -> ImageResult<()>
    where
        F: IntoIterator<Item = ImageResult<Frame>>,
    {
        let mut blocks = Vec::new();
        let mut background = 0;
        for (n, frame) in frames.into_iter().enumerate() {
            let frame = frame?;
            let view = frame.raster().view();
            if n == 0 {
                background = view.background_index();
            }
            let delay = frame.delay().to_centiseconds();
            blocks.extend(self.index_frame(
                view,
                frame.left(),
                frame.top(),
                delay,
                frame.disposal(),
            )?);
        }
        self.write_stream(&blocks, background)
    }

    /// Consumes the encoder, returning the writer.
    pub fn into_inner(self) -> W {
        self.w
    }

    /// Turns one raster into the image blocks that carry it.
    fn index_frame(
        &self,
        view: RasterView<'_>,
        left: u32,
        top: u32,
        delay: u16,
        disposal: DisposalMethod,
    ) -> ImageResult<Vec<IndexedFrame>> {
        let (width, height) = gif_dimensions(view.width(), view.height())?;
        let (left, top) = match (u16::try_from(left), u16::try_from(top)) {
            (Ok(left), Ok(top)) => (left, top),
            _ => return Err(EncoderError::OffsetTooLarge { left, top }.into()),
        };
        // the frame has to fit the logical screen as well
        gif_dimensions(
            u32::from(left) + u32::from(width),
            u32::from(top) + u32::from(height),
        )?;
        let mut control = GraphicControl {
            disposal,
            user_input: false,
            transparent: None,
            delay,
        };

        let Some(palette) = view.palette() else {
            return self.index_true_color(view, left, top, control);
        };
        control.transparent = match view.transparency() {
            Transparency::None => None,
            Transparency::Index(index) => Some(index),
            Transparency::Color(color) => Some(palette.nearest_index(color)),
        };

        let mut indices = Vec::with_capacity(usize::from(width) * usize::from(height));
        let mut row = vec![0; usize::from(width)];
        let mut cursor = RowCursor::new(view.height());
        for visual in rows::wire_rows(view.height(), self.interlaced) {
            cursor.seek(visual);
            if let Some(storage) = cursor.current_row() {
                view.read_row_indices(storage, &mut row);
                indices.extend_from_slice(&row);
            }
        }

        Ok(vec![IndexedFrame {
            left,
            top,
            width,
            height,
            colors: palette.as_slice().to_vec(),
            control,
            indices,
        }])
    }

    /// Builds a palette for a true-color raster, splitting it into cells when it uses more
    /// than 256 colors.
    fn index_true_color(
        &self,
        view: RasterView<'_>,
        left: u16,
        top: u16,
        control: GraphicControl,
    ) -> ImageResult<Vec<IndexedFrame>> {
        let whole = Cell {
            x: 0,
            y: 0,
            width: view.width(),
            height: view.height(),
        };
        if let Some(mut frame) = self.index_cell(view, whole, 0) {
            frame.left = left;
            frame.top = top;
            let transparent = match view.transparency() {
                Transparency::Color(color) => frame.colors.iter().position(|c| c.same_rgb(color)),
                _ => None,
            };
            frame.control = GraphicControl {
                transparent: transparent.map(|index| index as u8),
                ..control
            };
            return Ok(vec![frame]);
        }

        let cells = cells(view.width(), view.height());
        log::debug!(
            "more than {MAX_PALETTE_LEN} colors in a {}x{} image, writing {} cells",
            view.width(),
            view.height(),
            cells.len()
        );
        let last = cells.len() - 1;
        let mut frames = Vec::with_capacity(cells.len());
        for (n, cell) in cells.into_iter().enumerate() {
            // cells hold at most 255 pixels so they always fit
            let Some(mut frame) = self.index_cell(view, cell, 1) else {
                continue;
            };
            frame.left = left + cell.x as u16;
            frame.top = top + cell.y as u16;
            frame.control = GraphicControl {
                disposal: DisposalMethod::Keep,
                user_input: false,
                transparent: Some(0),
                delay: if n == last { control.delay } else { 0 },
            };
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Indexes the colors of `cell`, placing the first one at `first`. Returns `None` if they
    /// do not fit a 256 entry table.
    fn index_cell(&self, view: RasterView<'_>, cell: Cell, first: usize) -> Option<IndexedFrame> {
        let mut lookup: HashMap<Color, u8> = HashMap::new();
        let mut colors = vec![Color::BLACK; first];
        let mut indices = Vec::with_capacity(cell.width as usize * cell.height as usize);
        for visual in rows::wire_rows(cell.height, self.interlaced) {
            for x in 0..cell.width {
                let color = view.get_color(cell.x + x, cell.y + visual);
                let index = match lookup.get(&color) {
                    Some(&index) => index,
                    None => {
                        if colors.len() == MAX_PALETTE_LEN {
                            return None;
                        }
                        let index = colors.len() as u8;
                        colors.push(color);
                        lookup.insert(color, index);
                        index
                    }
                };
                indices.push(index);
            }
        }
        colors.resize(BitDepth::for_colors(colors.len()).palette_len(), Color::BLACK);

        Some(IndexedFrame {
            left: 0,
            top: 0,
            width: cell.width as u16,
            height: cell.height as u16,
            colors,
            control: GraphicControl::default(),
            indices,
        })
    }

    fn write_stream(&mut self, frames: &[IndexedFrame], background: u8) -> ImageResult<()> {
        let Some(first) = frames.first() else {
            return Err(ImageError::parameter(ParameterErrorKind::Generic(
                "no frames to encode".into(),
            )));
        };
        let screen_width = frames
            .iter()
            .map(|f| u32::from(f.left) + u32::from(f.width))
            .max()
            .unwrap_or(0);
        let screen_height = frames
            .iter()
            .map(|f| u32::from(f.top) + u32::from(f.height))
            .max()
            .unwrap_or(0);
        let (width, height) = gif_dimensions(screen_width, screen_height)?;

        let loop_count = self.repeat.loop_count();
        let extended = loop_count.is_some()
            || self.comment.is_some()
            || frames.len() > 1
            || frames.iter().any(|f| f.control != GraphicControl::default());
        self.w
            .write_all(if extended { b"GIF89a" } else { b"GIF87a" })?;

        let global = &first.colors;
        let screen = ScreenDescriptor {
            width,
            height,
            global_table: Some(first.table_size()),
            color_resolution: first.table_size(),
            background,
            aspect: 0,
        };
        screen.write_to(&mut self.w)?;
        write_color_table(&mut self.w, global)?;
        log::debug!(
            "writing {}x{} screen, {} image blocks, {:?}",
            width,
            height,
            frames.len(),
            self.compression
        );

        if let Some(count) = loop_count {
            self.w.write_u8(Block::Extension as u8)?;
            self.w.write_u8(Extension::Application as u8)?;
            self.w.write_u8(NETSCAPE.len() as u8)?;
            self.w.write_all(NETSCAPE)?;
            self.w.write_u8(3)?;
            self.w.write_u8(1)?;
            self.w.write_u16::<LittleEndian>(count)?;
            self.w.write_u8(0)?;
        }

        if let Some(comment) = &self.comment {
            self.w.write_u8(Block::Extension as u8)?;
            self.w.write_u8(Extension::Comment as u8)?;
            let mut blocks = SubBlockWriter::new(&mut self.w);
            blocks.write_bytes(comment.as_bytes())?;
            blocks.finish()?;
        }

        for frame in frames {
            if frame.control != GraphicControl::default() {
                self.w.write_u8(Block::Extension as u8)?;
                self.w.write_u8(Extension::Control as u8)?;
                self.w.write_u8(4)?;
                self.w.write_all(&frame.control.to_bytes())?;
                self.w.write_u8(0)?;
            }

            let local = !same_table(&frame.colors, global);
            let descriptor = ImageDescriptor {
                left: frame.left,
                top: frame.top,
                width: frame.width,
                height: frame.height,
                local_table: local.then(|| frame.table_size()),
                interlaced: self.interlaced,
            };
            descriptor.write_to(&mut self.w)?;
            if local {
                write_color_table(&mut self.w, &frame.colors)?;
            }

            let min_size = frame.min_code_size();
            self.w.write_u8(min_size)?;
            compress(
                self.compression,
                &frame.indices,
                min_size,
                &mut self.table,
                &mut self.w,
            )?;
        }

        self.w.write_u8(Block::Trailer as u8)?;
        Ok(())
    }
}

/// A rectangle of a true-color image written as its own image block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Cell {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

fn cells(width: u32, height: u32) -> Vec<Cell> {
    let mut cells = Vec::new();
    for y in (0..height).step_by(CELL_HEIGHT as usize) {
        for x in (0..width).step_by(CELL_WIDTH as usize) {
            cells.push(Cell {
                x,
                y,
                width: CELL_WIDTH.min(width - x),
                height: CELL_HEIGHT.min(height - y),
            });
        }
    }
    cells
}

fn write_color_table<W: Write>(w: &mut W, colors: &[Color]) -> std::io::Result<()> {
    for color in colors {
        w.write_all(&color.channels())?;
    }
    Ok(())
}

fn gif_dimensions(width: u32, height: u32) -> ImageResult<(u16, u16)> {
    fn inner_dimensions(width: u32, height: u32) -> Option<(u16, u16)> {
        let width = u16::try_from(width).ok()?;
        let height = u16::try_from(height).ok()?;
        Some((width, height))
    }

    inner_dimensions(width, height)
        .ok_or_else(|| EncoderError::DimensionsTooLarge { width, height }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Delay;
    use crate::gif::GifDecoder;
    use crate::raster::{BitDepth, Palette};

    fn checker(depth: BitDepth) -> Raster {
        let mut raster = Raster::new(5, 3, depth).unwrap();
        let ramp = Palette::grey_ramp(depth.palette_len());
        raster.palette_mut().unwrap().copy_from(ramp.as_slice());
        for y in 0..3 {
            for x in 0..5 {
                raster.set_index(x, y, ((x + y) % 2) as u8);
            }
        }
        raster
    }

    fn encode(raster: &Raster) -> Vec<u8> {
        let mut out = Vec::new();
        GifEncoder::new(&mut out).encode(raster).unwrap();
        out
    }

    #[test]
    fn plain_still_is_gif87a() {
        let raster = checker(BitDepth::One);
        let bytes = encode(&raster);
        assert_eq!(&bytes[..6], b"GIF87a");
        // 5x3 screen, global table of 2 entries
        assert_eq!(&bytes[6..13], &[5, 0, 3, 0, 0x80, 0, 0]);
        assert_eq!(&bytes[13..19], &[0, 0, 0, 0xFF, 0xFF, 0xFF]);
        assert_eq!(bytes[19], 0x2C);
        // no local table, code size 2
        assert_eq!(bytes[28], 0);
        assert_eq!(bytes[29], 2);
        assert_eq!(*bytes.last().unwrap(), 0x3B);
    }

    #[test]
    fn transparency_switches_to_gif89a() {
        let mut raster = checker(BitDepth::Four);
        raster.set_transparency(Transparency::Index(1));
        let bytes = encode(&raster);
        assert_eq!(&bytes[..6], b"GIF89a");

        let table_end = 13 + 16 * 3;
        assert_eq!(
            &bytes[table_end..table_end + 8],
            &[0x21, 0xF9, 4, 0x01, 0, 0, 1, 0]
        );
    }

    #[test]
    fn transparent_color_maps_to_nearest_index() {
        let mut raster = checker(BitDepth::One);
        raster.set_transparency(Transparency::Color(Color::rgb(250, 250, 250)));
        let bytes = encode(&raster);
        let decoded = GifDecoder::new(&bytes[..])
            .unwrap()
            .decode_frame(0)
            .unwrap();
        assert_eq!(decoded.transparency(), Transparency::Index(1));
    }

    #[test]
    fn loop_and_comment_extensions() {
        let raster = checker(BitDepth::One);
        let mut out = Vec::new();
        let mut encoder = GifEncoder::new(&mut out);
        encoder.set_repeat(Repeat::Infinite);
        encoder.set_comment("hi");
        encoder.encode(&raster).unwrap();

        let after_table = 13 + 2 * 3;
        let mut expected = vec![0x21, 0xFF, 11];
        expected.extend_from_slice(b"NETSCAPE2.0");
        expected.extend_from_slice(&[3, 1, 0, 0, 0]);
        expected.extend_from_slice(&[0x21, 0xFE, 2, b'h', b'i', 0]);
        assert_eq!(&out[after_table..after_table + expected.len()], &expected[..]);
    }

    #[test]
    fn finite_zero_repeat_writes_nothing() {
        let raster = checker(BitDepth::One);
        let mut out = Vec::new();
        let mut encoder = GifEncoder::new(&mut out);
        encoder.set_repeat(Repeat::Finite(0));
        encoder.encode(&raster).unwrap();
        assert_eq!(out, encode(&raster));
    }

    #[test]
    fn later_frames_carry_local_tables() {
        let first = checker(BitDepth::One);
        let mut second = checker(BitDepth::One);
        second
            .palette_mut()
            .unwrap()
            .set(1, Color::rgb(0xFF, 0, 0));

        let mut out = Vec::new();
        GifEncoder::new(&mut out)
            .encode_frames(vec![
                Frame::new(first.clone()),
                Frame::from_parts(
                    second,
                    0,
                    0,
                    Delay::from_centiseconds(5),
                    DisposalMethod::Background,
                ),
            ])
            .unwrap();

        let frames = GifDecoder::new(&out[..])
            .unwrap()
            .frames()
            .collect_frames()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].delay().to_centiseconds(), 5);
        assert_eq!(frames[1].disposal(), DisposalMethod::Background);
        assert_eq!(frames[1].raster().get_color(1, 0), Color::rgb(0xFF, 0, 0));
        assert_eq!(frames[0].raster().get_color(1, 0), Color::WHITE);
    }

    #[test]
    fn reserved_bytes_do_not_force_a_local_table() {
        let first = checker(BitDepth::One);
        let mut second = first.clone();
        let mut white = Color::WHITE;
        white.reserved = 0x80;
        second.palette_mut().unwrap().set(1, white);

        let two_frames = |second: Raster| {
            let mut out = Vec::new();
            GifEncoder::new(&mut out)
                .encode_frames(vec![Frame::new(first.clone()), Frame::new(second)])
                .unwrap();
            out
        };
        assert_eq!(two_frames(second), two_frames(first.clone()));
    }

    #[test]
    fn no_frames_is_a_parameter_error() {
        let mut out = Vec::new();
        let err = GifEncoder::new(&mut out)
            .encode_frames(Vec::new())
            .unwrap_err();
        assert!(matches!(err, ImageError::Parameter(_)));
    }

    #[test]
    fn oversized_offset_is_an_encoding_error() {
        let frame = Frame::from_parts(
            checker(BitDepth::One),
            70_000,
            0,
            Delay::from_centiseconds(0),
            DisposalMethod::Unspecified,
        );
        let mut out = Vec::new();
        let err = GifEncoder::new(&mut out)
            .encode_frames(vec![frame])
            .unwrap_err();
        assert!(matches!(err, ImageError::Encoding(_)));
    }

    #[test]
    fn true_color_with_few_colors_is_one_block() {
        let mut raster = Raster::new(4, 2, BitDepth::TwentyFour).unwrap();
        raster.set_color(0, 0, Color::rgb(1, 2, 3));
        raster.set_color(3, 1, Color::rgb(200, 100, 50));

        let decoded = GifDecoder::new(&encode(&raster)[..])
            .unwrap()
            .decode_frame(0)
            .unwrap();
        assert_eq!(decoded.bit_depth(), BitDepth::Four);
        assert_eq!(decoded.get_color(0, 0), Color::rgb(1, 2, 3));
        assert_eq!(decoded.get_color(3, 1), Color::rgb(200, 100, 50));
        assert_eq!(decoded.get_color(1, 0), Color::BLACK);
    }

    #[test]
    fn cells_cover_the_image() {
        let cells = cells(40, 20);
        assert_eq!(cells.len(), 3 * 2);
        assert_eq!(
            cells[2],
            Cell {
                x: 34,
                y: 0,
                width: 6,
                height: 15
            }
        );
        assert_eq!(cells[5].height, 5);
        let area: u32 = cells.iter().map(|c| c.width * c.height).sum();
        assert_eq!(area, 40 * 20);
    }
}
