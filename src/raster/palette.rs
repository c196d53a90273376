use std::cell::Cell;
use std::ops::Index;

use crate::color::Color;

/// Maximum number of entries a palette can hold.
pub const MAX_PALETTE_LEN: usize = 256;

/// A fixed-capacity ordered color table.
///
/// The table length is fixed when the palette is created (a raster of depth `n` always carries
/// `2^n` entries). Nearest-color lookups are memoized in a one-slot cache that belongs to this
/// palette, so converting runs of one solid color costs a single scan.
#[derive(Debug)]
pub struct Palette {
    entries: Vec<Color>,
    /// Number of entries taking part in nearest-color matching, 0 meaning all of them.
    important: usize,
    last_match: Cell<Option<(Color, u8)>>,
    #[cfg(test)]
    scans: Cell<usize>,
}

impl Palette {
    /// Creates a palette of `len` black entries.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero or larger than 256.
    #[must_use]
    pub fn new(len: usize) -> Palette {
        assert!(
            (1..=MAX_PALETTE_LEN).contains(&len),
            "palette length {len} out of range"
        );
        Palette {
            entries: vec![Color::BLACK; len],
            important: 0,
            last_match: Cell::new(None),
            #[cfg(test)]
            scans: Cell::new(0),
        }
    }

    /// Creates a palette of `len` entries evenly spread from black to white.
    #[must_use]
    pub fn grey_ramp(len: usize) -> Palette {
        let mut palette = Palette::new(len);
        let steps = (len - 1).max(1);
        for (i, entry) in palette.entries.iter_mut().enumerate() {
            let v = (i * 255 / steps) as u8;
            *entry = Color::rgb(v, v, v);
        }
        palette
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false, a palette holds at least one entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at `index`, if any.
    #[must_use]
    pub fn get(&self, index: u8) -> Option<Color> {
        self.entries.get(usize::from(index)).copied()
    }

    /// Replaces the entry at `index`. Indices past the end are ignored.
    pub fn set(&mut self, index: u8, color: Color) {
        if let Some(entry) = self.entries.get_mut(usize::from(index)) {
            *entry = color;
            self.last_match.set(None);
        }
    }

    /// Copies `colors` into the leading entries, truncating to the palette length.
    pub fn copy_from(&mut self, colors: &[Color]) {
        for (entry, &color) in self.entries.iter_mut().zip(colors) {
            *entry = color;
        }
        self.last_match.set(None);
    }

    /// All entries in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Color] {
        &self.entries
    }

    /// The entries viewed as `r, g, b, reserved` byte quadruples.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.entries)
    }

    /// Number of entries considered by [`nearest_index`](Self::nearest_index), 0 meaning all.
    #[must_use]
    pub fn important(&self) -> usize {
        self.important
    }

    /// Restricts nearest-color matching to the first `count` entries (0 restores all).
    pub fn set_important(&mut self, count: usize) {
        self.important = count.min(self.entries.len());
        self.last_match.set(None);
    }

    /// Returns the index of the entry closest to `color`.
    ///
    /// Scans the important entries with a squared per-channel distance and stops at the first
    /// exact match. The result is remembered for the next call with the same color.
    #[must_use]
    pub fn nearest_index(&self, color: Color) -> u8 {
        if let Some((last, index)) = self.last_match.get() {
            if last.same_rgb(color) {
                return index;
            }
        }

        #[cfg(test)]
        self.scans.set(self.scans.get() + 1);

        let count = match self.important {
            0 => self.entries.len(),
            n => n,
        };

        let mut best = 0;
        let mut best_distance = u32::MAX;
        for (i, entry) in self.entries[..count].iter().enumerate() {
            let distance = entry.distance_sq(color);
            if distance < best_distance {
                best_distance = distance;
                best = i;
                if distance == 0 {
                    break;
                }
            }
        }

        let index = best as u8;
        self.last_match.set(Some((color, index)));
        index
    }
}

impl Clone for Palette {
    fn clone(&self) -> Self {
        Palette {
            entries: self.entries.clone(),
            important: self.important,
            last_match: Cell::new(self.last_match.get()),
            #[cfg(test)]
            scans: Cell::new(0),
        }
    }
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && self.important == other.important
    }
}

impl Eq for Palette {}

impl Index<u8> for Palette {
    type Output = Color;

    fn index(&self, index: u8) -> &Color {
        &self.entries[usize::from(index)]
    }
}
