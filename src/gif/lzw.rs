//! Code table bookkeeping of the GIF flavour of Lempel–Ziv–Welch.
//!
//! Encoder and decoder agree on one rule for the code width: it starts at `min_size + 1` bits
//! and grows by one whenever the next code to be assigned no longer fits, up to 12 bits. Once
//! 4096 codes exist the encoder sends a clear code and both sides start over.

use std::fmt;

pub(crate) const MAX_CODESIZE: u8 = 12;
pub(crate) const MAX_ENTRIES: u16 = 1 << MAX_CODESIZE;

/// Alias for a LZW code point
pub(crate) type Code = u16;

/// Current code width and the reserved codes derived from the minimum code size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CodeSize {
    min_size: u8,
    width: u8,
}

impl CodeSize {
    pub(crate) fn new(min_size: u8) -> Self {
        CodeSize {
            min_size,
            width: min_size + 1,
        }
    }

    #[inline]
    pub(crate) fn width(&self) -> u8 {
        self.width
    }

    #[inline]
    pub(crate) fn max_code(&self) -> Code {
        (1 << self.width) - 1
    }

    #[inline]
    pub(crate) fn clear_code(&self) -> Code {
        1 << self.min_size
    }

    #[inline]
    pub(crate) fn end_code(&self) -> Code {
        self.clear_code() + 1
    }

    /// First code assigned after a clear.
    #[inline]
    pub(crate) fn first_free(&self) -> Code {
        self.clear_code() + 2
    }

    /// Widens the code when `next_code` would not fit, returning whether it did.
    #[inline]
    pub(crate) fn grow_for(&mut self, next_code: Code) -> bool {
        if next_code > self.max_code() && self.width < MAX_CODESIZE {
            self.width += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn reset(&mut self) {
        self.width = self.min_size + 1;
    }
}

/// A code that is neither in the table nor the next one to be assigned, without a previous
/// code to fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InvalidCode {
    pub(crate) code: Code,
    pub(crate) next_code: Code,
}

impl fmt::Display for InvalidCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid code {} at the start of a table with {} entries",
            self.code, self.next_code
        )
    }
}

/// Decoding dictionary
///
/// Every entry stores its prefix code and last byte, so a string is recovered by walking the
/// prefix chain onto a stack.
struct DecodingDict {
    min_size: u8,
    table: Vec<(Option<Code>, u8)>,
    stack: Vec<u8>,
}

impl DecodingDict {
    fn new(min_size: u8) -> DecodingDict {
        let mut dict = DecodingDict {
            min_size,
            table: Vec::with_capacity(usize::from(MAX_ENTRIES)),
            stack: Vec::with_capacity(usize::from(MAX_ENTRIES)),
        };
        dict.reset();
        dict
    }

    fn reset(&mut self) {
        self.table.clear();
        for i in 0..(1u16 << self.min_size) {
            self.table.push((None, i as u8));
        }
        // clear and end code
        self.table.push((None, 0));
        self.table.push((None, 0));
    }

    #[inline]
    fn next_code(&self) -> Code {
        self.table.len() as Code
    }

    #[inline]
    fn push(&mut self, prefix: Code, byte: u8) {
        if self.table.len() < usize::from(MAX_ENTRIES) {
            self.table.push((Some(prefix), byte));
        }
    }

    /// Expands `code` into the stack buffer, first byte first.
    fn reconstruct(&mut self, code: Code) -> &[u8] {
        self.stack.clear();
        let mut code = Some(code);
        while let Some(k) = code {
            let (prefix, byte) = self.table[usize::from(k)];
            self.stack.push(byte);
            code = prefix;
        }
        self.stack.reverse();
        &self.stack
    }

    #[inline]
    fn first_byte(&self, mut code: Code) -> u8 {
        loop {
            match self.table[usize::from(code)] {
                (Some(prefix), _) => code = prefix,
                (None, byte) => return byte,
            }
        }
    }
}

/// What a single code turned into.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step<'a> {
    /// Pixel indices, in order.
    Data(&'a [u8]),
    /// The table was reset.
    Clear,
    /// End of the image data.
    End,
}

/// Stateful code-by-code decoder.
pub(crate) struct LzwDecoder {
    size: CodeSize,
    dict: DecodingDict,
    prev: Option<Code>,
    /// Codes that were beyond the next assignable code and got replaced.
    pub(crate) bad_codes: usize,
}

impl LzwDecoder {
    pub(crate) fn new(min_size: u8) -> Self {
        LzwDecoder {
            size: CodeSize::new(min_size),
            dict: DecodingDict::new(min_size),
            prev: None,
            bad_codes: 0,
        }
    }

    /// Width of the next code to read.
    #[inline]
    pub(crate) fn width(&self) -> u8 {
        self.size.width()
    }

    /// Code the next table entry will be stored under.
    #[cfg(test)]
    pub(crate) fn next_code(&self) -> Code {
        self.dict.next_code()
    }

    /// Feeds one code.
    ///
    /// A code at or above the next free slot is read as the previous string followed by its own
    /// first byte. This is exactly right when the code equals the next slot and is a tolerated
    /// repair when it is larger.
    pub(crate) fn step(&mut self, code: Code) -> Result<Step<'_>, InvalidCode> {
        if code == self.size.clear_code() {
            log::trace!("clear code at {} entries", self.dict.next_code());
            self.dict.reset();
            self.size.reset();
            self.prev = None;
            return Ok(Step::Clear);
        }
        if code == self.size.end_code() {
            return Ok(Step::End);
        }

        let next_code = self.dict.next_code();
        let Some(prev) = self.prev else {
            if code >= next_code {
                return Err(InvalidCode { code, next_code });
            }
            self.prev = Some(code);
            return Ok(Step::Data(self.dict.reconstruct(code)));
        };

        let current = if code < next_code {
            let first = self.dict.first_byte(code);
            self.dict.push(prev, first);
            code
        } else {
            if code > next_code {
                self.bad_codes += 1;
                log::warn!("code {code} out of range (next {next_code}), using previous code");
            }
            let first = self.dict.first_byte(prev);
            self.dict.push(prev, first);
            next_code
        };
        self.size.grow_for(self.dict.next_code());
        self.prev = Some(current);
        Ok(Step::Data(self.dict.reconstruct(current)))
    }
}

/// Number of slots in the encoder's string table, a prime above 4096 for an 80% load.
pub(crate) const HSIZE: usize = 5003;
const HSHIFT: u32 = 4;

/// Open addressing string table of the classic LZW compressor.
///
/// Keys are `(byte << 12) + prefix`; the primary slot is `(byte << 4) ^ prefix` and collisions
/// step backwards by `HSIZE - slot`.
pub(crate) struct HashTable {
    keys: Vec<i32>,
    codes: Vec<Code>,
}

/// Outcome of a table lookup.
pub(crate) enum Probe {
    /// The string is known under this code.
    Hit(Code),
    /// The string is unknown; this slot is free for it.
    Miss(usize),
}

impl HashTable {
    pub(crate) fn new() -> Self {
        HashTable {
            keys: vec![-1; HSIZE],
            codes: vec![0; HSIZE],
        }
    }

    pub(crate) fn clear(&mut self) {
        self.keys.fill(-1);
    }

    #[inline]
    pub(crate) fn find(&self, prefix: Code, byte: u8) -> Probe {
        let key = (i32::from(byte) << MAX_CODESIZE) + i32::from(prefix);
        let mut slot = ((usize::from(byte) << HSHIFT) ^ usize::from(prefix)) % HSIZE;
        let step = if slot == 0 { 1 } else { HSIZE - slot };
        loop {
            match self.keys[slot] {
                k if k == key => return Probe::Hit(self.codes[slot]),
                k if k < 0 => return Probe::Miss(slot),
                _ => slot = (slot + HSIZE - step) % HSIZE,
            }
        }
    }

    #[inline]
    pub(crate) fn insert(&mut self, slot: usize, prefix: Code, byte: u8, code: Code) {
        self.keys[slot] = (i32::from(byte) << MAX_CODESIZE) + i32::from(prefix);
        self.codes[slot] = code;
    }
}
