use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{error, fmt, mem};

use byteorder_lite::ReadBytesExt;

use super::bits::{CodeReader, SubBlockReader};
use super::lzw::{InvalidCode, LzwDecoder, Step};
use super::{
    table_len, Block, DisposalMethod, Extension, GraphicControl, ImageDescriptor, Repeat,
    ScreenDescriptor, NETSCAPE, SIGNATURE,
};
use crate::animation::{Delay, Frame, Frames};
use crate::color::{same_table, Color};
use crate::error::{DecodingError, ImageError, ImageResult, ParameterErrorKind};
use crate::io::Limits;
use crate::raster::{BitDepth, Interlace, Palette, Raster, RowCursor, Transparency};

/// Largest minimum code size a pixel stream may declare.
const MAX_MIN_CODE_SIZE: u8 = 8;

#[derive(Debug)]
enum DecoderError {
    /// The stream does not start with `GIF8`.
    SignatureInvalid([u8; 4]),
    /// A byte where a block introducer was expected.
    BlockTagUnknown(u8),
    /// Graphic control payload of the wrong size.
    ControlLengthInvalid(usize),
    /// Minimum code size outside `1..=8`.
    CodeSizeInvalid(u8),
    /// An image descriptor with zero width or height.
    FrameEmpty,
    /// An LZW code that could not be repaired.
    Code(InvalidCode),
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderError::SignatureInvalid(sig) => {
                f.write_fmt(format_args!("GIF signature not found (got {sig:02X?})"))
            }
            DecoderError::BlockTagUnknown(tag) => {
                f.write_fmt(format_args!("Unknown block introducer {tag:#04X}"))
            }
            DecoderError::ControlLengthInvalid(len) => f.write_fmt(format_args!(
                "Graphic control extension has {len} bytes instead of 4"
            )),
            DecoderError::CodeSizeInvalid(size) => {
                f.write_fmt(format_args!("Invalid minimum code size {size}"))
            }
            DecoderError::FrameEmpty => f.write_str("Image block with zero width or height"),
            DecoderError::Code(code) => code.fmt(f),
        }
    }
}

impl From<DecoderError> for ImageError {
    fn from(e: DecoderError) -> ImageError {
        ImageError::Decoding(DecodingError::new(e))
    }
}

impl error::Error for DecoderError {}

/// Position of the block parser in the stream.
#[derive(Debug)]
enum State {
    ExpectBlockTag,
    ExtensionSubtype,
    SkipExtensionData { terminated: bool },
    ReadImageDescriptor,
    ReadLocalPalette(ImageDescriptor),
    InitLzw(ImageDescriptor, Option<Vec<Color>>),
    DecodeRows(FrameSetup),
    Trailer,
}

/// Everything known about an image block once its pixel data starts.
#[derive(Debug)]
struct FrameSetup {
    descriptor: ImageDescriptor,
    colors: Vec<Color>,
    min_size: u8,
}

/// Result of advancing the parser by one state.
enum Progress {
    Continue,
    Frame(Frame),
    Skipped,
    End,
}

/// GIF decoder
///
/// The decoder walks the stream block by block. Frames are produced in stream order as
/// composited canvases of the logical screen size: a frame whose graphic control extension asks
/// for disposal method 1 is drawn over the previous canvas, any other frame over a canvas
/// cleared to the background index.
///
/// The decoder reads the source a byte at a time, so a buffered reader should be passed in.
pub struct GifDecoder<R: Read> {
    reader: R,
    state: State,

    screen: ScreenDescriptor,
    global_palette: Option<Vec<Color>>,

    /// Graphic control extension waiting for the next image block.
    control: Option<GraphicControl>,
    comment: Option<String>,
    loop_count: Option<Repeat>,

    /// Image blocks seen so far, decoded or skipped.
    frames_read: usize,
    /// The last canvas, kept for frames that draw over it.
    previous: Option<Raster>,

    limits: Limits,
    escape: Option<Arc<AtomicBool>>,
}

impl<R: Read> GifDecoder<R> {
    /// Creates a new decoder that decodes the input stream `r`.
    ///
    /// Reads the signature, the logical screen descriptor and the global color table.
    pub fn new(mut r: R) -> ImageResult<GifDecoder<R>> {
        let mut signature = [0; 6];
        r.read_exact(&mut signature)?;
        if &signature[..4] != SIGNATURE {
            let mut prefix = [0; 4];
            prefix.copy_from_slice(&signature[..4]);
            return Err(DecoderError::SignatureInvalid(prefix).into());
        }

        let screen = ScreenDescriptor::read_from(&mut r)?;
        let global_palette = screen
            .global_table
            .map(|size| read_color_table(&mut r, size))
            .transpose()?;

        log::debug!(
            "GIF{} screen {}x{}, {} global colors, background {}",
            String::from_utf8_lossy(&signature[3..]),
            screen.width,
            screen.height,
            global_palette.as_ref().map_or(0, Vec::len),
            screen.background,
        );

        Ok(GifDecoder {
            reader: r,
            state: State::ExpectBlockTag,
            screen,
            global_palette,
            control: None,
            comment: None,
            loop_count: None,
            frames_read: 0,
            previous: None,
            limits: Limits::default(),
            escape: None,
        })
    }

    /// Size of the logical screen.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (u32::from(self.screen.width), u32::from(self.screen.height))
    }

    /// The global color table, if the stream has one.
    #[must_use]
    pub fn global_palette(&self) -> Option<&[Color]> {
        self.global_palette.as_deref()
    }

    /// Background palette index of the logical screen.
    #[must_use]
    pub fn background_index(&self) -> u8 {
        self.screen.background
    }

    /// Text of the last comment extension read so far.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Loop count from a `NETSCAPE2.0` application extension read so far.
    #[must_use]
    pub fn loop_count(&self) -> Option<Repeat> {
        self.loop_count
    }

    /// Replaces the resource limits.
    ///
    /// Fails right away if the logical screen already exceeds the dimension limits.
    pub fn set_limits(&mut self, limits: Limits) -> ImageResult<()> {
        let (width, height) = self.dimensions();
        limits.check_dimensions(width, height)?;
        self.limits = limits;
        Ok(())
    }

    /// Installs a flag that aborts decoding with [`ParameterErrorKind::Cancelled`] when raised.
    ///
    /// The flag is polled once per decoded row.
    pub fn set_escape(&mut self, escape: Arc<AtomicBool>) {
        self.escape = Some(escape);
    }

    /// Decodes the next frame, or returns `None` after the trailer.
    ///
    /// After an error the decoder yields no further frames.
    pub fn next_frame(&mut self) -> ImageResult<Option<Frame>> {
        loop {
            match self.step(true)? {
                Progress::Frame(frame) => return Ok(Some(frame)),
                Progress::End => return Ok(None),
                Progress::Continue | Progress::Skipped => {}
            }
        }
    }

    /// Decodes the frame at `index`, counting image blocks from the start of the stream.
    ///
    /// Earlier frames are decoded as well, since a frame may be drawn over its predecessor.
    pub fn decode_frame(mut self, index: usize) -> ImageResult<Raster> {
        loop {
            let position = self.frames_read;
            match self.next_frame()? {
                Some(frame) if position == index => return Ok(frame.into_raster()),
                Some(_) if position < index => {}
                _ => return Err(ImageError::parameter(ParameterErrorKind::NoMoreData)),
            }
        }
    }

    /// Counts the image blocks of the stream without decoding the remaining pixel data.
    pub fn frame_count(mut self) -> ImageResult<usize> {
        while !matches!(self.step(false)?, Progress::End) {}
        Ok(self.frames_read)
    }

    /// Returns an iterator over the remaining frames.
    pub fn frames<'a>(mut self) -> Frames<'a>
    where
        R: 'a,
    {
        Frames::new(Box::new(std::iter::from_fn(move || {
            self.next_frame().transpose()
        })))
    }

    fn step(&mut self, decode_pixels: bool) -> ImageResult<Progress> {
        // an error leaves the parser in its terminal state
        match mem::replace(&mut self.state, State::Trailer) {
            State::ExpectBlockTag => {
                let tag = match self.reader.read_u8() {
                    Ok(tag) => tag,
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && self.frames_read > 0 => {
                        log::warn!("stream ended without a trailer");
                        return Ok(Progress::End);
                    }
                    Err(e) => return Err(e.into()),
                };
                self.state = match Block::from_u8(tag) {
                    Some(Block::Image) => State::ReadImageDescriptor,
                    Some(Block::Extension) => State::ExtensionSubtype,
                    Some(Block::Trailer) => return Ok(Progress::End),
                    None => return Err(DecoderError::BlockTagUnknown(tag).into()),
                };
            }
            State::ExtensionSubtype => {
                let label = self.reader.read_u8()?;
                let terminated = self.read_extension(label)?;
                self.state = State::SkipExtensionData { terminated };
            }
            State::SkipExtensionData { terminated } => {
                if !terminated {
                    let skipped = SubBlockReader::new(&mut self.reader).skip_remaining()?;
                    if skipped > 0 {
                        log::trace!("skipped {skipped} bytes of extension data");
                    }
                }
                self.state = State::ExpectBlockTag;
            }
            State::ReadImageDescriptor => {
                let descriptor = ImageDescriptor::read_from(&mut self.reader)?;
                if descriptor.width == 0 || descriptor.height == 0 {
                    return Err(DecoderError::FrameEmpty.into());
                }
                self.state = State::ReadLocalPalette(descriptor);
            }
            State::ReadLocalPalette(descriptor) => {
                let local = descriptor
                    .local_table
                    .map(|size| read_color_table(&mut self.reader, size))
                    .transpose()?;
                self.state = State::InitLzw(descriptor, local);
            }
            State::InitLzw(descriptor, local) => {
                let min_size = self.reader.read_u8()?;
                if !(1..=MAX_MIN_CODE_SIZE).contains(&min_size) {
                    return Err(DecoderError::CodeSizeInvalid(min_size).into());
                }
                let colors = local
                    .or_else(|| self.global_palette.clone())
                    .unwrap_or_else(|| {
                        log::debug!("no color table, using a grey ramp");
                        Palette::grey_ramp(1 << min_size).as_slice().to_vec()
                    });
                self.state = State::DecodeRows(FrameSetup {
                    descriptor,
                    colors,
                    min_size,
                });
            }
            State::DecodeRows(setup) => {
                let control = self.control.take();
                let index = self.frames_read;
                self.frames_read += 1;
                if !decode_pixels {
                    SubBlockReader::new(&mut self.reader).skip_remaining()?;
                    self.state = State::ExpectBlockTag;
                    return Ok(Progress::Skipped);
                }
                let frame = self.decode_rows(&setup, control)?;
                let canvas = self.compose(frame, &setup.descriptor, control)?;
                log::debug!(
                    "frame {index}: {}x{} at ({}, {}), {} colors, {} bits",
                    setup.descriptor.width,
                    setup.descriptor.height,
                    setup.descriptor.left,
                    setup.descriptor.top,
                    setup.colors.len(),
                    canvas.bit_depth().bits(),
                );
                let control = control.unwrap_or_default();
                self.state = State::ExpectBlockTag;
                return Ok(Progress::Frame(Frame::from_parts(
                    canvas,
                    0,
                    0,
                    Delay::from_centiseconds(control.delay),
                    control.disposal,
                )));
            }
            State::Trailer => return Ok(Progress::End),
        }
        Ok(Progress::Continue)
    }

    /// Handles the payload of the extension labelled `label`, returning whether its terminator
    /// was consumed.
    fn read_extension(&mut self, label: u8) -> ImageResult<bool> {
        let mut blocks = SubBlockReader::new(&mut self.reader);
        match Extension::from_u8(label) {
            Some(Extension::Control) => {
                let payload = match blocks.next_block()? {
                    Some(block) if block.len() == 4 => [block[0], block[1], block[2], block[3]],
                    Some(block) => {
                        return Err(DecoderError::ControlLengthInvalid(block.len()).into())
                    }
                    None => return Err(DecoderError::ControlLengthInvalid(0).into()),
                };
                let control = GraphicControl::from_bytes(payload);
                log::debug!("graphic control {control:?}");
                self.control = Some(control);
            }
            Some(Extension::Comment) => {
                let text = blocks.read_to_end()?;
                log::debug!("comment of {} bytes", text.len());
                self.comment = Some(String::from_utf8_lossy(&text).into_owned());
            }
            Some(Extension::Application) => {
                let is_netscape = matches!(blocks.next_block()?, Some(id) if id == NETSCAPE);
                if is_netscape {
                    if let Some(&[1, lo, hi, ..]) = blocks.next_block()? {
                        let repeat = Repeat::from_loop_count(u16::from_le_bytes([lo, hi]));
                        log::debug!("loop count {repeat:?}");
                        self.loop_count = Some(repeat);
                    }
                }
            }
            Some(Extension::Text) | None => {
                log::debug!("skipping extension {label:#04X}");
            }
        }
        Ok(blocks.is_done())
    }

    /// Decodes the pixel data of one image block into a frame-sized raster.
    fn decode_rows(
        &mut self,
        setup: &FrameSetup,
        control: Option<GraphicControl>,
    ) -> ImageResult<Raster> {
        let descriptor = &setup.descriptor;
        let width = u32::from(descriptor.width);
        let height = u32::from(descriptor.height);
        let depth = BitDepth::for_colors(setup.colors.len());

        let mut budget = self.limits.clone();
        let mut frame = Raster::with_limits(width, height, depth, &mut budget)?;
        if let Some(palette) = frame.palette_mut() {
            palette.copy_from(&setup.colors);
        }
        if let Some(index) = control.and_then(|c| c.transparent) {
            frame.set_transparency(Transparency::Index(index));
        }

        let escape = self.escape.clone();
        let mut lzw = LzwDecoder::new(setup.min_size);
        let mut codes = CodeReader::new(&mut self.reader);
        let mut cursor = RowCursor::new(height);
        let mut interlace = descriptor.interlaced.then(|| Interlace::new(height));

        let mut row = vec![0u8; width as usize];
        let mut filled = 0;
        let mut rows_done = 0;

        while let Some(code) = codes.next_code(lzw.width())? {
            let mut data = match lzw.step(code).map_err(DecoderError::Code)? {
                Step::Data(data) => data,
                Step::Clear => continue,
                Step::End => break,
            };
            while !data.is_empty() && rows_done < height {
                let n = (row.len() - filled).min(data.len());
                row[filled..filled + n].copy_from_slice(&data[..n]);
                filled += n;
                data = &data[n..];
                if filled < row.len() {
                    continue;
                }

                check_escape(escape.as_deref())?;
                if let Some(rows) = interlace.as_mut() {
                    if let Some(visual) = rows.next() {
                        cursor.seek(visual);
                    }
                }
                cursor.write(&mut frame, &row);
                cursor.advance_up();
                rows_done += 1;
                filled = 0;
            }
        }

        let trailing = codes.skip_remaining()?;
        if trailing > 0 {
            log::debug!("{trailing} bytes after the end code");
        }
        if rows_done < height {
            log::warn!("image data ended after {rows_done} of {height} rows");
        }
        if lzw.bad_codes > 0 {
            log::warn!("repaired {} out of range codes", lzw.bad_codes);
        }
        Ok(frame)
    }

    /// Places a decoded frame on the canvas of the logical screen.
    fn compose(
        &mut self,
        frame: Raster,
        descriptor: &ImageDescriptor,
        control: Option<GraphicControl>,
    ) -> ImageResult<Raster> {
        let left = u32::from(descriptor.left);
        let top = u32::from(descriptor.top);
        let width = u32::from(self.screen.width).max(left + frame.width());
        let height = u32::from(self.screen.height).max(top + frame.height());
        let disposal = control.map_or(DisposalMethod::Unspecified, |c| c.disposal);
        let transparent = control.and_then(|c| c.transparent);

        let mut budget = self.limits.clone();
        budget.reserve_usize(frame.pixels().len())?;

        let previous = match self.previous.take() {
            Some(previous) if disposal == DisposalMethod::Keep => {
                if previous.width() == width && previous.height() == height {
                    Some(previous)
                } else {
                    log::warn!("canvas size changed, not drawing over the previous frame");
                    None
                }
            }
            _ => None,
        };

        let canvas = match previous {
            Some(previous) => {
                budget.reserve_usize(previous.pixels().len())?;
                draw_over(previous, &frame, left, top, transparent, &mut budget)?
            }
            None => {
                let mut canvas = Raster::with_limits(width, height, frame.bit_depth(), &mut budget)?;
                if let (Some(dst), Some(src)) = (canvas.palette_mut(), frame.palette()) {
                    dst.copy_from(src.as_slice());
                }
                let colors = self.global_palette.as_ref().map_or(0, Vec::len);
                let background = self.screen.background;
                canvas.set_background_index(background);
                canvas.fill_index(if usize::from(background) < colors {
                    background
                } else {
                    0
                });
                canvas.set_transparency(frame.transparency());
                blit(&mut canvas, &frame, left, top, None);
                canvas
            }
        };

        budget.reserve_usize(canvas.pixels().len())?;
        self.previous = Some(canvas.clone());
        Ok(canvas)
    }
}

/// Draws `frame` over a previous canvas, leaving pixels with the transparent index untouched.
///
/// Index-wise drawing requires the two palettes to agree on their common prefix; otherwise the
/// canvas is promoted to true color and the frame drawn by color.
fn draw_over(
    previous: Raster,
    frame: &Raster,
    left: u32,
    top: u32,
    transparent: Option<u8>,
    budget: &mut Limits,
) -> ImageResult<Raster> {
    let shared = match (previous.palette(), frame.palette()) {
        (Some(prev), Some(next)) => {
            let n = prev.len().min(next.len());
            same_table(&prev.as_slice()[..n], &next.as_slice()[..n])
        }
        _ => false,
    };

    if shared {
        let adopt_palette = frame.bit_depth() > previous.bit_depth();
        let depth = previous.bit_depth().max(frame.bit_depth());
        let mut canvas = if depth == previous.bit_depth() {
            previous
        } else {
            budget.reserve_usize(Raster::buffer_size(
                previous.width(),
                previous.height(),
                depth,
            )?)?;
            previous.increase_bit_depth(depth)?
        };
        if adopt_palette {
            if let (Some(dst), Some(src)) = (canvas.palette_mut(), frame.palette()) {
                dst.copy_from(src.as_slice());
            }
        }
        blit(&mut canvas, frame, left, top, transparent);
        return Ok(canvas);
    }

    log::debug!("palettes differ, drawing over the previous frame in true color");
    let mut canvas = if previous.bit_depth() == BitDepth::TwentyFour {
        previous
    } else {
        budget.reserve_usize(Raster::buffer_size(
            previous.width(),
            previous.height(),
            BitDepth::TwentyFour,
        )?)?;
        previous.increase_bit_depth(BitDepth::TwentyFour)?
    };
    let view = frame.view();
    let mut indices = vec![0; frame.width() as usize];
    for fy in 0..frame.height() {
        view.read_row_indices(frame.height() - 1 - fy, &mut indices);
        for (fx, &index) in indices.iter().enumerate() {
            if Some(index) != transparent {
                canvas.set_color(left + fx as u32, top + fy, view.get_color(fx as u32, fy));
            }
        }
    }
    Ok(canvas)
}

/// Copies the indices of `frame` onto `canvas` at (`left`, `top`), skipping `transparent`.
fn blit(canvas: &mut Raster, frame: &Raster, left: u32, top: u32, transparent: Option<u8>) {
    let view = frame.view();
    let mut indices = vec![0; frame.width() as usize];
    for fy in 0..frame.height() {
        view.read_row_indices(frame.height() - 1 - fy, &mut indices);
        for (fx, &index) in indices.iter().enumerate() {
            if Some(index) != transparent {
                canvas.set_index(left + fx as u32, top + fy, index);
            }
        }
    }
}

fn check_escape(escape: Option<&AtomicBool>) -> ImageResult<()> {
    if escape.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
        log::debug!("decoding cancelled");
        return Err(ImageError::parameter(ParameterErrorKind::Cancelled));
    }
    Ok(())
}

fn read_color_table<R: Read>(r: &mut R, size: u8) -> io::Result<Vec<Color>> {
    let mut bytes = vec![0; 3 * table_len(size)];
    r.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(3)
        .map(|rgb| Color::rgb(rgb[0], rgb[1], rgb[2]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Header, a 2x2 screen without a global table and one image block with a local
    /// black and white table.
    fn two_by_two() -> Vec<u8> {
        let mut data = b"GIF87a".to_vec();
        data.extend_from_slice(&[2, 0, 2, 0, 0, 0, 0]);
        data.extend_from_slice(&[0x2C, 0, 0, 0, 0, 2, 0, 2, 0, 0x80]);
        data.extend_from_slice(&[0, 0, 0, 0xFF, 0xFF, 0xFF]);
        // code size 2: clear, 0, 1, 1 at 3 bits, then 0 and end at 4 bits
        data.extend_from_slice(&[2, 3, 0x44, 0x02, 0x05, 0, 0x3B]);
        data
    }

    #[test]
    fn decodes_hand_built_stream() {
        let raster = GifDecoder::new(Cursor::new(two_by_two()))
            .unwrap()
            .decode_frame(0)
            .unwrap();
        assert_eq!(raster.bit_depth(), BitDepth::One);
        assert_eq!(raster.get_index(0, 0), 0);
        assert_eq!(raster.get_index(1, 0), 1);
        assert_eq!(raster.get_index(0, 1), 1);
        assert_eq!(raster.get_index(1, 1), 0);
        // the top row is stored last
        assert_eq!(raster.row(1)[0] >> 6, 0b01);
        assert_eq!(raster.palette().unwrap()[1], Color::WHITE);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = two_by_two();
        data[0] = b'P';
        assert!(matches!(
            GifDecoder::new(Cursor::new(data)),
            Err(ImageError::Decoding(_))
        ));
    }

    #[test]
    fn truncated_stream_is_a_decoding_error() {
        let data = two_by_two();
        let cut = &data[..data.len() - 5];
        let err = GifDecoder::new(Cursor::new(cut.to_vec()))
            .unwrap()
            .decode_frame(0)
            .unwrap_err();
        assert!(matches!(err, ImageError::Decoding(_)));
    }

    #[test]
    fn missing_frame_is_reported() {
        let decoder = GifDecoder::new(Cursor::new(two_by_two())).unwrap();
        assert!(matches!(
            decoder.decode_frame(1),
            Err(ImageError::Parameter(e)) if e.kind() == ParameterErrorKind::NoMoreData
        ));
    }

    #[test]
    fn counts_frames_without_decoding() {
        let decoder = GifDecoder::new(Cursor::new(two_by_two())).unwrap();
        assert_eq!(decoder.frame_count().unwrap(), 1);
    }

    #[test]
    fn raised_escape_cancels() {
        let mut decoder = GifDecoder::new(Cursor::new(two_by_two())).unwrap();
        decoder.set_escape(Arc::new(AtomicBool::new(true)));
        assert!(matches!(
            decoder.next_frame(),
            Err(ImageError::Parameter(e)) if e.kind() == ParameterErrorKind::Cancelled
        ));
        // nothing more after a failure
        assert!(decoder.next_frame().unwrap().is_none());
    }

    #[test]
    fn limits_are_checked_before_decoding() {
        let mut decoder = GifDecoder::new(Cursor::new(two_by_two())).unwrap();
        let mut limits = Limits::no_limits();
        limits.max_image_width = Some(1);
        assert!(matches!(
            decoder.set_limits(limits),
            Err(ImageError::Limits(_))
        ));

        let mut limits = Limits::no_limits();
        limits.max_alloc = Some(8);
        decoder.set_limits(limits).unwrap();
        assert!(matches!(decoder.next_frame(), Err(ImageError::Limits(_))));
    }

    #[test]
    fn reserved_bytes_keep_the_canvas_indexed() {
        let mut previous = Raster::new(2, 2, BitDepth::One).unwrap();
        previous
            .palette_mut()
            .unwrap()
            .copy_from(&[Color::BLACK, Color::WHITE]);
        let mut frame = previous.clone();
        let mut white = Color::WHITE;
        white.reserved = 3;
        frame.palette_mut().unwrap().set(1, white);
        frame.set_index(1, 1, 1);

        let canvas = draw_over(previous, &frame, 0, 0, None, &mut Limits::no_limits()).unwrap();
        assert_eq!(canvas.bit_depth(), BitDepth::One);
        assert_eq!(canvas.get_index(1, 1), 1);
        assert_eq!(canvas.get_index(0, 0), 0);
    }

    #[test]
    fn unknown_extensions_are_skipped() {
        let mut data = two_by_two();
        let body = data.split_off(13);
        data.extend_from_slice(&[0x21, 0x01, 3, b'a', b'b', b'c', 1, b'd', 0]);
        data.extend_from_slice(&[0x21, 0xFE, 2, b'h', b'i', 0]);
        data.extend_from_slice(&body);

        let mut decoder = GifDecoder::new(Cursor::new(data)).unwrap();
        assert!(decoder.next_frame().unwrap().is_some());
        assert_eq!(decoder.comment(), Some("hi"));
    }
}
