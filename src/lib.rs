//! # Overview
//!
//! This crate provides a bottom-up, word-aligned raster container and a GIF codec built on top
//! of it. The codec implements the LZW code stream itself, so it needs no compression library.
//!
//! A [`Raster`] holds 1, 4 or 8-bit palette indices or 24-bit blue, green, red triples. Rows
//! are stored with the visual bottom row first, while every pixel accessor takes coordinates
//! counted from the visual top.
//!
//! # High level API
//!
//! ```rust,no_run
//! use rastergif::{BitDepth, Raster};
//! # fn main() -> rastergif::ImageResult<()> {
//! let mut raster = Raster::new(32, 32, BitDepth::Four)?;
//! raster.set_index(3, 4, 7);
//! rastergif::save("small.gif", &raster)?;
//!
//! let back = rastergif::open("small.gif")?;
//! assert_eq!(back.get_index(3, 4), 7);
//! # Ok(())
//! # }
//! ```
//!
//! # Animations
//!
//! [`gif::GifDecoder`] yields every frame of a stream through [`Frames`], compositing frames
//! that keep the previous image onto it. [`gif::GifEncoder`] writes a sequence of [`Frame`]s
//! with one of three [`gif::Compression`] strategies.
//!
//! # Limits
//!
//! Every raster allocation is bounded by [`MAX_RASTER_BYTES`]. Decoding additionally honours the
//! dimension and allocation budget of [`Limits`].
#![warn(missing_docs)]
#![warn(unused_qualifications)]
#![warn(unreachable_pub)]
#![deny(deprecated)]
#![forbid(unsafe_code)]

pub use crate::animation::{Delay, Frame, Frames};
pub use crate::color::Color;
pub use crate::error::{
    DecodingError, EncodingError, ImageError, ImageResult, LimitError, LimitErrorKind,
    ParameterError, ParameterErrorKind, UnsupportedError, UnsupportedErrorKind,
};
pub use crate::io::free_functions::{encode_to_vec, load_from_memory, open, save};
pub use crate::io::Limits;
pub use crate::raster::{
    BitDepth, Interlace, Palette, Raster, RasterView, RowCursor, Transparency, MAX_PALETTE_LEN,
    MAX_RASTER_BYTES,
};

pub mod gif;

mod animation;
mod color;
pub mod error;
mod io;
mod raster;
