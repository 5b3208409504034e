//! DDRAM shadow buffer and cursor tracking
//!
//! The driver mirrors every character it writes in a [`ShadowBuffer`] so it
//! can verify the controller's memory and rebuild it after a
//! resynchronization.
//!
//! ## Layout
//!
//! The buffer is indexed in the controller's own address-counter order, not
//! row by row. With two-line addressing, index `i` lives at DDRAM address
//! `i` for the first 40 cells and at `0x40 + (i - 40)` for the rest:
//!
//! ```text
//! index   0..19   20..39   40..59   60..79
//! DDRAM   00..13  14..27   40..53   54..67
//! row     0       2        1        3
//! ```
//!
//! With one-line addressing index `i` is DDRAM address `i`.

use crate::config::{
    Geometry, MAX_COLUMNS, MAX_ROWS, ROW_BUFFER_OFFSET, ROW_DDRAM_BASE, SHADOW_SIZE,
};

/// Character the controller's clear instruction writes into every cell
pub const BLANK: u8 = 0x20;

/// Cells per DDRAM line in two-line mode
const LINE_LENGTH: u8 = 40;

/// DDRAM address of the second line in two-line mode
const SECOND_LINE: u8 = 0x40;

/// DDRAM address of buffer cell `index`
pub fn address_for_index(index: u8, two_line: bool) -> u8 {
    if two_line && index >= LINE_LENGTH {
        SECOND_LINE + (index - LINE_LENGTH)
    } else {
        index
    }
}

/// Buffer index and DDRAM address of a visible cell
///
/// `column` is clamped to the widest supported row and `row` to the last
/// row of `geometry`.
pub fn cell_position(column: u8, row: u8, geometry: &Geometry) -> (u8, u8) {
    let row = row.min(geometry.rows.saturating_sub(1)).min(MAX_ROWS - 1) as usize;
    let column = column.min(MAX_COLUMNS - 1);
    (
        ROW_BUFFER_OFFSET[row] + column,
        ROW_DDRAM_BASE[row] + column,
    )
}

/// Expected DDRAM contents
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShadowBuffer {
    cells: [u8; SHADOW_SIZE],
}

impl Default for ShadowBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowBuffer {
    /// A buffer of blanks, matching a freshly cleared controller
    pub fn new() -> Self {
        Self {
            cells: [BLANK; SHADOW_SIZE],
        }
    }

    /// All cells in buffer order
    pub fn cells(&self) -> &[u8; SHADOW_SIZE] {
        &self.cells
    }

    /// Cell at `index`
    pub fn get(&self, index: u8) -> Option<u8> {
        self.cells.get(index as usize).copied()
    }

    /// Cells of a visible row, `columns` wide
    pub fn row(&self, row: u8, columns: u8) -> &[u8] {
        let start = ROW_BUFFER_OFFSET[(row as usize).min(ROW_BUFFER_OFFSET.len() - 1)] as usize;
        &self.cells[start..start + columns.min(MAX_COLUMNS) as usize]
    }

    /// Store `value` at `index`
    pub fn record(&mut self, index: u8, value: u8) {
        if let Some(cell) = self.cells.get_mut(index as usize) {
            *cell = value;
        }
    }

    /// Reset every cell to [`BLANK`]
    pub fn blank(&mut self) {
        self.cells = [BLANK; SHADOW_SIZE];
    }
}

/// Where the next character goes
///
/// The buffer index and the DDRAM address always move together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorState {
    buffer_index: u8,
    ddram_address: u8,
}

impl CursorState {
    /// Index 0, address 0
    pub fn origin() -> Self {
        Self::default()
    }

    /// Cursor at a visible cell, clamped like [`cell_position`]
    pub fn at(column: u8, row: u8, geometry: &Geometry) -> Self {
        let (buffer_index, ddram_address) = cell_position(column, row, geometry);
        Self {
            buffer_index,
            ddram_address,
        }
    }

    /// Cursor at a buffer index
    pub fn from_index(index: u8, two_line: bool) -> Self {
        let buffer_index = index % SHADOW_SIZE as u8;
        Self {
            buffer_index,
            ddram_address: address_for_index(buffer_index, two_line),
        }
    }

    /// Shadow buffer index
    pub fn buffer_index(&self) -> u8 {
        self.buffer_index
    }

    /// DDRAM address
    pub fn ddram_address(&self) -> u8 {
        self.ddram_address
    }

    /// Cursor after one write, following the entry direction
    ///
    /// Wraps inside the buffer the way the address counter wraps inside
    /// DDRAM.
    #[must_use]
    pub fn advance(self, left_to_right: bool, two_line: bool) -> Self {
        let size = SHADOW_SIZE as u8;
        let index = if left_to_right {
            (self.buffer_index + 1) % size
        } else {
            (self.buffer_index + size - 1) % size
        };
        Self::from_index(index, two_line)
    }
}
