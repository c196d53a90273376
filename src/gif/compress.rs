//! The three body compressors of the encoder.
//!
//! All of them take the frame's palette indices in stream order and produce a code stream any
//! GIF decoder understands: a clear code first, the pixel codes, the end code, and the code
//! writer's trailing partial byte and sub-block terminator.

use std::io::{self, Write};

use super::bits::CodeWriter;
use super::lzw::{Code, CodeSize, HashTable, Probe, MAX_CODESIZE, MAX_ENTRIES};
use super::Compression;

/// Compresses `pixels` with the chosen strategy and writes the code stream to `w`.
pub(crate) fn compress<W: Write>(
    compression: Compression,
    pixels: &[u8],
    min_size: u8,
    table: &mut HashTable,
    w: W,
) -> io::Result<W> {
    let mut out = CodeWriter::new(w);
    match compression {
        Compression::None => compress_none(pixels, min_size, &mut out)?,
        Compression::Lzw => compress_lzw(pixels, min_size, table, &mut out)?,
        Compression::Rle => RleCompressor::new(min_size, &mut out).compress(pixels)?,
    }
    out.finish()
}

/// Writes every pixel as a literal.
///
/// No strings are ever stored, but the code counter advances as it would in a decoder's table
/// so the width follows the decoder and a clear is sent when that table fills up.
fn compress_none<W: Write>(pixels: &[u8], min_size: u8, out: &mut CodeWriter<W>) -> io::Result<()> {
    let mut size = CodeSize::new(min_size);
    let mut free_ent = size.first_free();

    out.write_code(size.clear_code(), size.width())?;
    for &pixel in pixels {
        out.write_code(Code::from(pixel), size.width())?;
        size.grow_for(free_ent);
        if free_ent < MAX_ENTRIES {
            free_ent += 1;
        } else {
            out.write_code(size.clear_code(), size.width())?;
            size.reset();
            free_ent = size.first_free();
        }
    }
    out.write_code(size.end_code(), size.width())
}

/// Classic LZW over an open addressing string table.
fn compress_lzw<W: Write>(
    pixels: &[u8],
    min_size: u8,
    table: &mut HashTable,
    out: &mut CodeWriter<W>,
) -> io::Result<()> {
    let mut size = CodeSize::new(min_size);
    let mut free_ent = size.first_free();
    table.clear();

    out.write_code(size.clear_code(), size.width())?;
    let Some((&first, rest)) = pixels.split_first() else {
        return out.write_code(size.end_code(), size.width());
    };

    let mut ent = Code::from(first);
    for &c in rest {
        match table.find(ent, c) {
            Probe::Hit(code) => ent = code,
            Probe::Miss(slot) => {
                out.write_code(ent, size.width())?;
                size.grow_for(free_ent);
                if free_ent < MAX_ENTRIES {
                    table.insert(slot, ent, c, free_ent);
                    free_ent += 1;
                } else {
                    table.clear();
                    out.write_code(size.clear_code(), size.width())?;
                    size.reset();
                    free_ent = size.first_free();
                }
                ent = Code::from(c);
            }
        }
    }

    out.write_code(ent, size.width())?;
    size.grow_for(free_ent);
    out.write_code(size.end_code(), size.width())
}

/// Run-length compressor producing a valid LZW stream ("miGIF").
///
/// A run of one pixel value is expressed through the strings a decoder builds while reading
/// it: after the codes `p`, then the code for `pp`, then `ppp`, ... the decoder's table holds
/// runs of every length up to the longest one sent. The compressor tracks which run codes the
/// decoder knows and, for each run, picks between repeating those codes, sending plain
/// literals, or clearing the table to rebuild the run codes from scratch.
struct RleCompressor<'a, W: Write> {
    out: &'a mut CodeWriter<W>,

    rl_pixel: u8,
    rl_count: usize,
    /// Pixel whose run codes the decoder currently holds.
    rl_table_pixel: u8,
    /// Longest run code the decoder currently holds.
    rl_table_max: usize,
    just_cleared: bool,

    code_clear: Code,
    code_eof: Code,
    rl_basecode: usize,

    out_bits: u8,
    out_bits_init: u8,
    /// Codes sent since the last clear.
    out_count: usize,
    out_bump: usize,
    out_bump_init: usize,
    out_clear: usize,
    out_clear_init: usize,
    max_ocodes: usize,
}

impl<'a, W: Write> RleCompressor<'a, W> {
    fn new(min_size: u8, out: &'a mut CodeWriter<W>) -> Self {
        let init_bits = min_size + 1;
        let code_clear: Code = 1 << min_size;
        let code_eof = code_clear + 1;
        let out_bump_init = (1usize << min_size) - 1;
        RleCompressor {
            out,
            rl_pixel: 0,
            rl_count: 0,
            rl_table_pixel: 0,
            rl_table_max: 0,
            just_cleared: true,
            code_clear,
            code_eof,
            rl_basecode: usize::from(code_eof) + 1,
            out_bits: init_bits,
            out_bits_init: init_bits,
            out_count: 0,
            out_bump: out_bump_init,
            out_bump_init,
            out_clear: 0,
            // more room before a forced clear favours images with many runs
            out_clear_init: if init_bits <= 3 { 9 } else { out_bump_init - 1 },
            max_ocodes: (1usize << MAX_CODESIZE) - ((1usize << min_size) + 3),
        }
    }

    fn compress(mut self, pixels: &[u8]) -> io::Result<()> {
        self.did_clear();
        self.output(self.code_clear)?;
        for &c in pixels {
            if self.rl_count > 0 && c != self.rl_pixel {
                self.rl_flush()?;
            }
            if self.rl_count > 0 {
                self.rl_count += 1;
            } else {
                self.rl_pixel = c;
                self.rl_count = 1;
            }
        }
        if self.rl_count > 0 {
            self.rl_flush()?;
        }
        self.output(self.code_eof)
    }

    #[inline]
    fn output(&mut self, code: Code) -> io::Result<()> {
        self.out.write_code(code, self.out_bits)
    }

    fn did_clear(&mut self) {
        self.out_bits = self.out_bits_init;
        self.out_bump = self.out_bump_init;
        self.out_clear = self.out_clear_init;
        self.out_count = 0;
        self.rl_table_max = 0;
        self.just_cleared = true;
    }

    fn clear(&mut self) -> io::Result<()> {
        self.output(self.code_clear)?;
        self.did_clear();
        Ok(())
    }

    /// Sends a code the decoder will add a table entry for.
    fn output_plain(&mut self, code: usize) -> io::Result<()> {
        self.just_cleared = false;
        self.output(code as Code)?;
        self.out_count += 1;
        if self.out_count >= self.out_bump {
            self.out_bits += 1;
            self.out_bump += 1 << (self.out_bits - 1);
        }
        if self.out_count >= self.out_clear {
            self.clear()?;
        }
        Ok(())
    }

    fn max_out_clear(&mut self) {
        self.out_clear = self.max_ocodes;
    }

    fn reset_out_clear(&mut self) -> io::Result<()> {
        self.out_clear = self.out_clear_init;
        if self.out_count >= self.out_clear {
            self.clear()?;
        }
        Ok(())
    }

    /// Rebuilds run codes from an empty table while sending `count` pixels.
    fn rl_flush_fromclear(&mut self, mut count: usize) -> io::Result<()> {
        self.max_out_clear();
        self.rl_table_pixel = self.rl_pixel;
        let mut n = 1;
        while count > 0 {
            if n == 1 {
                self.rl_table_max = 1;
                self.output_plain(usize::from(self.rl_pixel))?;
                count -= 1;
            } else if count >= n {
                self.rl_table_max = n;
                self.output_plain(self.rl_basecode + n - 2)?;
                count -= n;
            } else if count == 1 {
                self.rl_table_max += 1;
                self.output_plain(usize::from(self.rl_pixel))?;
                count = 0;
            } else {
                self.rl_table_max += 1;
                self.output_plain(self.rl_basecode + count - 2)?;
                count = 0;
            }
            n = if self.out_count == 0 { 1 } else { n + 1 };
        }
        self.reset_out_clear()
    }

    fn rl_flush_clearorrep(&mut self, count: usize) -> io::Result<()> {
        let with_clear = 1 + compute_triangle_count(count, self.max_ocodes);
        if with_clear < count {
            self.clear()?;
            self.rl_flush_fromclear(count)
        } else {
            for _ in 0..count {
                self.output_plain(usize::from(self.rl_pixel))?;
            }
            Ok(())
        }
    }

    fn rl_flush_withtable(&mut self, count: usize) -> io::Result<()> {
        let mut repmax = count / self.rl_table_max;
        let mut leftover = count % self.rl_table_max;
        let mut repleft = usize::from(leftover != 0);
        if self.out_count + repmax + repleft > self.max_ocodes {
            repmax = self.max_ocodes - self.out_count;
            leftover = count - repmax * self.rl_table_max;
            repleft = 1 + compute_triangle_count(leftover, self.max_ocodes);
        }
        if 1 + compute_triangle_count(count, self.max_ocodes) < repmax + repleft {
            self.clear()?;
            return self.rl_flush_fromclear(count);
        }
        self.max_out_clear();
        for _ in 0..repmax {
            self.output_plain(self.rl_basecode + self.rl_table_max - 2)?;
        }
        if leftover > 0 {
            if self.just_cleared {
                self.rl_flush_fromclear(leftover)?;
            } else if leftover == 1 {
                self.output_plain(usize::from(self.rl_pixel))?;
            } else {
                self.output_plain(self.rl_basecode + leftover - 2)?;
            }
        }
        self.reset_out_clear()
    }

    fn rl_flush(&mut self) -> io::Result<()> {
        let count = self.rl_count;
        self.rl_count = 0;
        if count == 1 {
            return self.output_plain(usize::from(self.rl_pixel));
        }
        if self.just_cleared {
            self.rl_flush_fromclear(count)
        } else if self.rl_table_max < 2 || self.rl_table_pixel != self.rl_pixel {
            self.rl_flush_clearorrep(count)
        } else {
            self.rl_flush_withtable(count)
        }
    }
}

fn isqrt(x: usize) -> usize {
    if x < 2 {
        return x;
    }
    let mut v = x;
    let mut r = 1;
    while v > 0 {
        v >>= 2;
        r <<= 1;
    }
    loop {
        v = ((x / r) + r) / 2;
        if v == r || v == r + 1 {
            return r;
        }
        r = v;
    }
}

/// Minimum number of run codes needed to send `count` pixels when at most `nrepcodes` codes
/// fit before the next clear.
fn compute_triangle_count(mut count: usize, nrepcodes: usize) -> usize {
    let mut cost = 0;
    let perrep = nrepcodes * (nrepcodes + 1) / 2;
    while count >= perrep {
        cost += nrepcodes;
        count -= perrep;
    }
    if count > 0 {
        let mut n = isqrt(count);
        while n * (n + 1) >= 2 * count {
            n -= 1;
        }
        while n * (n + 1) < 2 * count {
            n += 1;
        }
        cost += n;
    }
    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gif::bits::CodeReader;
    use crate::gif::lzw::{LzwDecoder, Step};

    fn decode(stream: &[u8], min_size: u8) -> Vec<u8> {
        let mut reader = CodeReader::new(stream);
        let mut decoder = LzwDecoder::new(min_size);
        let mut pixels = Vec::new();
        while let Some(code) = reader.next_code(decoder.width()).unwrap() {
            match decoder.step(code).unwrap() {
                Step::Data(data) => pixels.extend_from_slice(data),
                Step::Clear => {}
                Step::End => break,
            }
        }
        assert_eq!(decoder.bad_codes, 0);
        pixels
    }

    fn codes(stream: &[u8], widths: &[u8]) -> Vec<u16> {
        let mut reader = CodeReader::new(stream);
        widths
            .iter()
            .map(|&w| reader.next_code(w).unwrap().unwrap())
            .collect()
    }

    fn encode(compression: Compression, pixels: &[u8], min_size: u8) -> Vec<u8> {
        let mut table = HashTable::new();
        compress(compression, pixels, min_size, &mut table, Vec::new()).unwrap()
    }

    fn sample(len: usize, colors: u8) -> Vec<u8> {
        let mut state = 0x2545_F491u32;
        (0..len)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                // long runs mixed with noise
                if (i / 37) % 3 == 0 {
                    (i / 37 % usize::from(colors)) as u8
                } else {
                    (state % u32::from(colors)) as u8
                }
            })
            .collect()
    }

    #[test]
    fn isqrt_floor() {
        for x in 0..2000usize {
            let r = isqrt(x);
            assert!(r * r <= x && (r + 1) * (r + 1) > x, "isqrt({x}) = {r}");
        }
    }

    #[test]
    fn triangle_count() {
        assert_eq!(compute_triangle_count(1, 100), 1);
        assert_eq!(compute_triangle_count(3, 100), 2);
        assert_eq!(compute_triangle_count(6, 100), 3);
        assert_eq!(compute_triangle_count(7, 100), 4);
        assert_eq!(compute_triangle_count(7, 2), 5);
    }

    #[test]
    fn copy_writes_literals() {
        let stream = encode(Compression::None, &[0, 1, 1, 0], 2);
        assert_eq!(codes(&stream, &[3, 3, 3, 3, 4, 4]), [4, 0, 1, 1, 0, 5]);
    }

    #[test]
    fn copy_width_follows_decoder_table() {
        // a decoder holds entries 6 and 7 after three literals and reads four bits from then on
        let stream = encode(Compression::None, &[1, 2, 3, 0, 1], 2);
        assert_eq!(codes(&stream, &[3, 3, 3, 3, 4, 4, 4]), [4, 1, 2, 3, 0, 1, 5]);
    }

    #[test]
    fn lzw_reuses_strings() {
        let stream = encode(Compression::Lzw, &[1, 1, 1, 1], 2);
        // 1, then "11" (6), then 1
        assert_eq!(codes(&stream, &[3, 3, 3, 3, 4]), [4, 1, 6, 1, 5]);
    }

    #[test]
    fn every_strategy_round_trips() {
        for (min_size, colors) in [(2u8, 2u8), (2, 4), (4, 16), (8, 255)] {
            let pixels = sample(20_000, colors);
            for compression in [Compression::None, Compression::Lzw, Compression::Rle] {
                let stream = encode(compression, &pixels, min_size);
                assert_eq!(
                    decode(&stream, min_size),
                    pixels,
                    "{compression:?} with code size {min_size}"
                );
            }
        }
    }

    #[test]
    fn long_runs_round_trip() {
        let mut pixels = vec![3u8; 50_000];
        pixels.extend(std::iter::repeat(1).take(7));
        pixels.push(0);
        pixels.extend(std::iter::repeat(3).take(9000));
        for compression in [Compression::None, Compression::Lzw, Compression::Rle] {
            let stream = encode(compression, &pixels, 2);
            assert_eq!(decode(&stream, 2), pixels, "{compression:?}");
        }
    }

    #[test]
    fn rle_beats_copy_on_runs() {
        let pixels = vec![5u8; 10_000];
        let rle = encode(Compression::Rle, &pixels, 4);
        let copy = encode(Compression::None, &pixels, 4);
        assert!(rle.len() * 10 < copy.len());
    }

    #[test]
    fn clear_is_sent_when_the_table_is_full() {
        // every pair of distinct literals is a new string, so the table fills quickly
        let pixels = sample(40_000, 255);
        for compression in [Compression::None, Compression::Lzw] {
            let stream = encode(compression, &pixels, 8);

            let mut reader = CodeReader::new(&stream[..]);
            let mut decoder = LzwDecoder::new(8);
            let mut table_sizes = Vec::new();
            while let Some(code) = reader.next_code(decoder.width()).unwrap() {
                let filled = decoder.next_code();
                match decoder.step(code).unwrap() {
                    Step::Clear => table_sizes.push(filled),
                    Step::End => break,
                    Step::Data(_) => {}
                }
            }

            // the leading clear finds a fresh table, every later one a full table
            assert_eq!(table_sizes[0], 258, "{compression:?}");
            assert!(table_sizes.len() > 2, "{compression:?}");
            for &size in &table_sizes[1..] {
                assert_eq!(size, MAX_ENTRIES, "{compression:?}");
            }
        }
    }
}
