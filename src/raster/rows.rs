//! Mapping between wire row order and storage row order.
//!
//! GIF transmits the top row first while a [`Raster`] stores the bottom row first. A
//! [`RowCursor`] starts at the last storage row and moves toward row 0 as wire rows are
//! consumed. Interlaced images visit their rows in four passes; [`Interlace`] yields that
//! schedule as visual row numbers, which the cursor then turns into storage rows.

use crate::raster::Raster;

const PASS_OFFSETS: [u32; 4] = [0, 4, 2, 1];
const PASS_STRIDES: [u32; 4] = [8, 8, 4, 2];

/// A position in storage rows, moving from the visual top of a raster to its bottom.
#[derive(Clone, Debug)]
pub struct RowCursor {
    height: u32,
    row: Option<u32>,
}

impl RowCursor {
    /// Places the cursor on the last storage row (the visual top) of a raster `height` rows
    /// high.
    #[must_use]
    pub fn new(height: u32) -> Self {
        RowCursor {
            height,
            row: height.checked_sub(1),
        }
    }

    /// The storage row under the cursor, or `None` once the cursor moved past row 0.
    #[must_use]
    pub fn current_row(&self) -> Option<u32> {
        self.row
    }

    /// Packs one wire row of palette indices into the storage row under the cursor.
    ///
    /// Does nothing once the cursor is exhausted.
    pub fn write(&self, raster: &mut Raster, indices: &[u8]) {
        if let Some(row) = self.row {
            raster.write_row_indices(row, indices);
        }
    }

    /// Moves one storage row toward row 0, returning whether a row is still under the cursor.
    pub fn advance_up(&mut self) -> bool {
        self.row = self.row.and_then(|row| row.checked_sub(1));
        self.row.is_some()
    }

    /// Places the cursor on visual row `visual_row`, counted from the top.
    ///
    /// Rows past the bottom exhaust the cursor.
    pub fn seek(&mut self, visual_row: u32) {
        self.row = self
            .height
            .checked_sub(1)
            .and_then(|last| last.checked_sub(visual_row));
    }
}

/// The interlaced row schedule of an image `height` rows high, as visual row numbers.
#[derive(Clone, Debug)]
pub struct Interlace {
    height: u32,
    pass: usize,
    next: u32,
}

impl Interlace {
    /// Starts the schedule at the first row of pass 0.
    #[must_use]
    pub fn new(height: u32) -> Self {
        Interlace {
            height,
            pass: 0,
            next: PASS_OFFSETS[0],
        }
    }
}

impl Iterator for Interlace {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        while self.pass < PASS_OFFSETS.len() {
            if self.next < self.height {
                let row = self.next;
                self.next += PASS_STRIDES[self.pass];
                return Some(row);
            }
            self.pass += 1;
            if let Some(&offset) = PASS_OFFSETS.get(self.pass) {
                self.next = offset;
            }
        }
        None
    }
}

/// Visual row numbers in the order a stream carries them.
pub(crate) fn wire_rows(height: u32, interlaced: bool) -> Box<dyn Iterator<Item = u32>> {
    if interlaced {
        Box::new(Interlace::new(height))
    } else {
        Box::new(0..height)
    }
}
