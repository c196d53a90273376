//! Decoding and Encoding of GIF Images
//!
//! GIF (Graphics Interchange Format) is an image format that supports lossless compression of
//! palette images and simple animations. Both directions are implemented here on top of the
//! in-memory [`Raster`](crate::Raster), including the LZW code stream, without an external
//! compression library.
//!
//! # Related Links
//! * <https://www.w3.org/Graphics/GIF/spec-gif89a.txt> - The GIF Specification
//!
//! # Examples
//! ```rust,no_run
//! use rastergif::gif::GifDecoder;
//! # fn main() -> std::io::Result<()> {
//! # let f = std::fs::File::open("animation.gif")?;
//! let decoder = GifDecoder::new(std::io::BufReader::new(f)).unwrap();
//! let frames = decoder.frames().collect_frames().expect("error decoding gif");
//! # Ok(())
//! # }
//! ```

use std::io::{self, Read, Write};

use byteorder_lite::{LittleEndian, ReadBytesExt, WriteBytesExt};

mod bits;
mod compress;
mod decoder;
mod encoder;
mod lzw;

pub use self::decoder::GifDecoder;
pub use self::encoder::GifEncoder;

/// Signature prefix shared by every GIF version.
const SIGNATURE: &[u8; 4] = b"GIF8";

/// Application identifier of the looping extension.
const NETSCAPE: &[u8; 11] = b"NETSCAPE2.0";

/// Known block types
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Block {
    Image = 0x2C,
    Extension = 0x21,
    Trailer = 0x3B,
}

impl Block {
    fn from_u8(byte: u8) -> Option<Block> {
        match byte {
            0x2C => Some(Block::Image),
            0x21 => Some(Block::Extension),
            0x3B => Some(Block::Trailer),
            _ => None,
        }
    }
}

/// Known GIF extensions
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Extension {
    Text = 0x01,
    Control = 0xF9,
    Comment = 0xFE,
    Application = 0xFF,
}

impl Extension {
    fn from_u8(byte: u8) -> Option<Extension> {
        match byte {
            0x01 => Some(Extension::Text),
            0xF9 => Some(Extension::Control),
            0xFE => Some(Extension::Comment),
            0xFF => Some(Extension::Application),
            _ => None,
        }
    }
}

/// Method to dispose of a frame, as stored in the graphic control extension.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisposalMethod {
    /// No disposal specified.
    #[default]
    Unspecified = 0,
    /// Draw the frame over the previous one.
    ///
    /// The decoder composites frames carrying this method onto the previous canvas.
    Keep = 1,
    /// Restore the frame area to the background.
    Background = 2,
    /// Restore the frame area to what was there before.
    Previous = 3,
}

impl DisposalMethod {
    /// Reserved values 4 to 7 read as [`DisposalMethod::Unspecified`].
    #[must_use]
    pub fn from_u8(value: u8) -> DisposalMethod {
        match value {
            1 => DisposalMethod::Keep,
            2 => DisposalMethod::Background,
            3 => DisposalMethod::Previous,
            _ => DisposalMethod::Unspecified,
        }
    }
}

/// Body compressor used by the encoder.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Every pixel is written as a literal code.
    None,
    /// Classic LZW with a hashed string table.
    #[default]
    Lzw,
    /// Run-length coding that stays decodable by any LZW decoder.
    Rle,
}

/// Number of repetitions for an animation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Repeat {
    /// Plays the animation the given number of times. `Finite(0)` writes no looping extension.
    Finite(u16),
    /// Loops forever.
    Infinite,
}

impl Repeat {
    /// Interprets the loop count stored in a looping extension, 0 meaning forever.
    #[must_use]
    pub fn from_loop_count(count: u16) -> Repeat {
        match count {
            0 => Repeat::Infinite,
            n => Repeat::Finite(n),
        }
    }

    fn loop_count(self) -> Option<u16> {
        match self {
            Repeat::Finite(0) => None,
            Repeat::Finite(n) => Some(n),
            Repeat::Infinite => Some(0),
        }
    }
}

/// The logical screen descriptor following the signature.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ScreenDescriptor {
    width: u16,
    height: u16,
    /// Size exponent of the global color table, if present.
    global_table: Option<u8>,
    color_resolution: u8,
    background: u8,
    aspect: u8,
}

impl ScreenDescriptor {
    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let width = r.read_u16::<LittleEndian>()?;
        let height = r.read_u16::<LittleEndian>()?;
        let flags = r.read_u8()?;
        let background = r.read_u8()?;
        let aspect = r.read_u8()?;
        Ok(ScreenDescriptor {
            width,
            height,
            global_table: (flags & 0x80 != 0).then_some(flags & 0x07),
            color_resolution: (flags >> 4) & 0x07,
            background,
            aspect,
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut flags = (self.color_resolution & 0x07) << 4;
        if let Some(size) = self.global_table {
            flags |= 0x80 | (size & 0x07);
        }
        w.write_u16::<LittleEndian>(self.width)?;
        w.write_u16::<LittleEndian>(self.height)?;
        w.write_u8(flags)?;
        w.write_u8(self.background)?;
        w.write_u8(self.aspect)
    }
}

/// The descriptor following an image separator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ImageDescriptor {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    /// Size exponent of the local color table, if present.
    local_table: Option<u8>,
    interlaced: bool,
}

impl ImageDescriptor {
    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let left = r.read_u16::<LittleEndian>()?;
        let top = r.read_u16::<LittleEndian>()?;
        let width = r.read_u16::<LittleEndian>()?;
        let height = r.read_u16::<LittleEndian>()?;
        let flags = r.read_u8()?;
        Ok(ImageDescriptor {
            left,
            top,
            width,
            height,
            local_table: (flags & 0x80 != 0).then_some(flags & 0x07),
            interlaced: flags & 0x40 != 0,
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut flags = 0;
        if let Some(size) = self.local_table {
            flags |= 0x80 | (size & 0x07);
        }
        if self.interlaced {
            flags |= 0x40;
        }
        w.write_u8(Block::Image as u8)?;
        w.write_u16::<LittleEndian>(self.left)?;
        w.write_u16::<LittleEndian>(self.top)?;
        w.write_u16::<LittleEndian>(self.width)?;
        w.write_u16::<LittleEndian>(self.height)?;
        w.write_u8(flags)
    }
}

/// The four byte payload of a graphic control extension.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct GraphicControl {
    disposal: DisposalMethod,
    user_input: bool,
    transparent: Option<u8>,
    /// Delay in hundredths of a second.
    delay: u16,
}

impl GraphicControl {
    fn from_bytes(payload: [u8; 4]) -> Self {
        let flags = payload[0];
        GraphicControl {
            disposal: DisposalMethod::from_u8((flags >> 2) & 0x07),
            user_input: flags & 0x02 != 0,
            transparent: (flags & 0x01 != 0).then_some(payload[3]),
            delay: u16::from_le_bytes([payload[1], payload[2]]),
        }
    }

    fn to_bytes(self) -> [u8; 4] {
        let mut flags = (self.disposal as u8) << 2;
        if self.user_input {
            flags |= 0x02;
        }
        if self.transparent.is_some() {
            flags |= 0x01;
        }
        let [lo, hi] = self.delay.to_le_bytes();
        [flags, lo, hi, self.transparent.unwrap_or(0)]
    }
}

/// Number of color table entries for a size exponent.
fn table_len(size: u8) -> usize {
    2 << (size & 0x07)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphic_control_bits() {
        let control = GraphicControl::from_bytes([0b0000_0101, 10, 0, 7]);
        assert_eq!(control.disposal, DisposalMethod::Keep);
        assert_eq!(control.transparent, Some(7));
        assert_eq!(control.delay, 10);
        assert!(!control.user_input);
        assert_eq!(control.to_bytes(), [0b0000_0101, 10, 0, 7]);

        let control = GraphicControl::from_bytes([0b0001_1100, 0, 1, 9]);
        assert_eq!(control.disposal, DisposalMethod::Unspecified);
        assert_eq!(control.transparent, None);
        assert_eq!(control.delay, 256);
    }

    #[test]
    fn screen_descriptor_layout() {
        let screen = ScreenDescriptor {
            width: 0x0102,
            height: 3,
            global_table: Some(7),
            color_resolution: 7,
            background: 4,
            aspect: 0,
        };
        let mut bytes = Vec::new();
        screen.write_to(&mut bytes).unwrap();
        assert_eq!(bytes, [0x02, 0x01, 3, 0, 0xF7, 4, 0]);
        assert_eq!(ScreenDescriptor::read_from(&mut &bytes[..]).unwrap(), screen);
    }

    #[test]
    fn table_sizes() {
        assert_eq!(table_len(0), 2);
        assert_eq!(table_len(3), 16);
        assert_eq!(table_len(7), 256);
    }
}
