//! Sub-block framing and variable-width code packing.
//!
//! GIF splits every extension payload and every compressed image body into sub-blocks of at
//! most 255 bytes, each prefixed by its length and the sequence closed by an empty sub-block.
//! LZW codes are packed into that byte stream least significant bit first.

use std::io::{self, Read, Write};

use byteorder_lite::{ReadBytesExt, WriteBytesExt};

const MAX_SUB_BLOCK: usize = 255;

/// Buffers bytes into length-prefixed sub-blocks.
pub(crate) struct SubBlockWriter<W: Write> {
    w: W,
    buf: [u8; MAX_SUB_BLOCK],
    len: usize,
}

impl<W: Write> SubBlockWriter<W> {
    pub(crate) fn new(w: W) -> Self {
        SubBlockWriter {
            w,
            buf: [0; MAX_SUB_BLOCK],
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len == MAX_SUB_BLOCK {
            self.flush_block()?;
        }
        Ok(())
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        bytes.iter().try_for_each(|&b| self.write_byte(b))
    }

    fn flush_block(&mut self) -> io::Result<()> {
        if self.len > 0 {
            self.w.write_u8(self.len as u8)?;
            self.w.write_all(&self.buf[..self.len])?;
            self.len = 0;
        }
        Ok(())
    }

    /// Writes the pending sub-block and the empty terminator.
    pub(crate) fn finish(mut self) -> io::Result<W> {
        self.flush_block()?;
        self.w.write_u8(0)?;
        Ok(self.w)
    }
}

/// Packs variable-width codes, least significant bit first, into sub-blocks.
pub(crate) struct CodeWriter<W: Write> {
    blocks: SubBlockWriter<W>,
    acc: u32,
    bits: u8,
}

impl<W: Write> CodeWriter<W> {
    pub(crate) fn new(w: W) -> Self {
        CodeWriter {
            blocks: SubBlockWriter::new(w),
            acc: 0,
            bits: 0,
        }
    }

    /// Appends the low `width` bits of `code`.
    #[inline]
    pub(crate) fn write_code(&mut self, code: u16, width: u8) -> io::Result<()> {
        debug_assert!(width <= 12 && u32::from(code) < 1 << width);
        self.acc |= u32::from(code) << self.bits;
        self.bits += width;
        while self.bits >= 8 {
            self.blocks.write_byte(self.acc as u8)?;
            self.acc >>= 8;
            self.bits -= 8;
        }
        Ok(())
    }

    /// Writes the partial byte and terminates the sub-block sequence.
    pub(crate) fn finish(mut self) -> io::Result<W> {
        if self.bits > 0 {
            self.blocks.write_byte(self.acc as u8)?;
        }
        self.blocks.finish()
    }
}

/// Reads a sequence of sub-blocks one block at a time.
pub(crate) struct SubBlockReader<R: Read> {
    r: R,
    buf: [u8; MAX_SUB_BLOCK],
    len: usize,
    pos: usize,
    done: bool,
}

impl<R: Read> SubBlockReader<R> {
    pub(crate) fn new(r: R) -> Self {
        SubBlockReader {
            r,
            buf: [0; MAX_SUB_BLOCK],
            len: 0,
            pos: 0,
            done: false,
        }
    }

    /// Reads the next sub-block, or returns `None` once the terminator was consumed.
    ///
    /// A sub-block cut short by the end of the stream is an `UnexpectedEof` error.
    pub(crate) fn next_block(&mut self) -> io::Result<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }
        let len = usize::from(self.r.read_u8()?);
        if len == 0 {
            self.done = true;
            self.len = 0;
            self.pos = 0;
            return Ok(None);
        }
        self.r.read_exact(&mut self.buf[..len])?;
        self.len = len;
        self.pos = len;
        Ok(Some(&self.buf[..len]))
    }

    /// Whether the terminator has been consumed.
    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    /// Returns the next payload byte, refilling one sub-block at a time.
    #[inline]
    pub(crate) fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pos == self.len {
            if self.next_block()?.is_none() {
                return Ok(None);
            }
            self.pos = 0;
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    /// Consumes sub-blocks up to and including the terminator, returning how many bytes were
    /// skipped.
    pub(crate) fn skip_remaining(&mut self) -> io::Result<usize> {
        let mut skipped = self.len - self.pos;
        self.pos = self.len;
        while let Some(block) = self.next_block()? {
            skipped += block.len();
        }
        Ok(skipped)
    }

    /// Collects the payload of all remaining sub-blocks.
    pub(crate) fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut data = self.buf[self.pos..self.len].to_vec();
        self.pos = self.len;
        while let Some(block) = self.next_block()? {
            data.extend_from_slice(block);
        }
        Ok(data)
    }
}

/// Unpacks variable-width codes, least significant bit first, from sub-blocks.
pub(crate) struct CodeReader<R: Read> {
    blocks: SubBlockReader<R>,
    acc: u32,
    bits: u8,
}

impl<R: Read> CodeReader<R> {
    pub(crate) fn new(r: R) -> Self {
        CodeReader {
            blocks: SubBlockReader::new(r),
            acc: 0,
            bits: 0,
        }
    }

    /// Returns the next `width`-bit code, or `None` at the end of the data.
    #[inline]
    pub(crate) fn next_code(&mut self, width: u8) -> io::Result<Option<u16>> {
        while self.bits < width {
            match self.blocks.next_byte()? {
                Some(byte) => {
                    self.acc |= u32::from(byte) << self.bits;
                    self.bits += 8;
                }
                None => return Ok(None),
            }
        }
        let code = self.acc & ((1 << width) - 1);
        self.acc >>= width;
        self.bits -= width;
        Ok(Some(code as u16))
    }

    /// Skips whatever follows the last code read, up to the terminator.
    pub(crate) fn skip_remaining(&mut self) -> io::Result<usize> {
        self.acc = 0;
        self.bits = 0;
        self.blocks.skip_remaining()
    }
}
