use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use crate::error::{ImageError, ImageResult, ParameterErrorKind};
use crate::gif::{DisposalMethod, GifDecoder, GifEncoder};
use crate::raster::Raster;

/// Open the GIF file at `path` and decode the first image it displays.
///
/// See [`load_from_memory`] for how that image is chosen.
pub fn open<P: AsRef<Path>>(path: P) -> ImageResult<Raster> {
    let file = File::open(path.as_ref()).map_err(ImageError::IoError)?;
    first_displayed(GifDecoder::new(BufReader::new(file))?)
}

/// Decode the first image a GIF stream held in memory displays.
///
/// A frame that is kept in place and shown for no time at all is only a layer of the image
/// drawn over it, so decoding continues through such frames. For a plain animation this is the
/// first frame. For a true-color raster written in cells by [`save`] it is the whole raster.
pub fn load_from_memory(buffer: &[u8]) -> ImageResult<Raster> {
    first_displayed(GifDecoder::new(Cursor::new(buffer))?)
}

fn first_displayed<R: Read>(mut decoder: GifDecoder<R>) -> ImageResult<Raster> {
    let mut layered = None;
    while let Some(frame) = decoder.next_frame()? {
        let held =
            frame.disposal() == DisposalMethod::Keep && frame.delay().to_centiseconds() == 0;
        let raster = frame.into_raster();
        if !held {
            return Ok(raster);
        }
        layered = Some(raster);
    }
    layered.ok_or_else(|| ImageError::parameter(ParameterErrorKind::NoMoreData))
}

/// Encode `raster` as a single-frame GIF and write it to the file at `path`.
pub fn save<P: AsRef<Path>>(path: P, raster: &Raster) -> ImageResult<()> {
    let file = File::create(path.as_ref()).map_err(ImageError::IoError)?;
    let mut writer = BufWriter::new(file);
    GifEncoder::new(&mut writer).encode(raster)?;
    writer.flush()?;
    Ok(())
}

/// Encode `raster` as a single-frame GIF into a fresh buffer.
pub fn encode_to_vec(raster: &Raster) -> ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    GifEncoder::new(&mut bytes).encode(raster)?;
    Ok(bytes)
}
