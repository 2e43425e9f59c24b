//! Module grid of a QR Code symbol.
//!
//! Every cell holds two flags: bit 0 is the colour (set = dark) and bit 1
//! marks a function module that data placement and masking must skip.

use super::tables::{alignment_positions, dimension, format_bits, version_bits};
use crate::writer::barcode::QrErrorCorrection;

/// Data module, light.
pub const DATA_WHITE: u8 = 0;
/// Data module, dark.
pub const DATA_BLACK: u8 = 1;
/// Function module, light.
pub const FIXED_WHITE: u8 = 2;
/// Function module, dark.
pub const FIXED_BLACK: u8 = 3;

const DARK: u8 = 1;
const NON_DATA: u8 = 2;

/// Square grid of module states, row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    dim: usize,
    cells: Vec<u8>,
}

impl QrMatrix {
    /// Grid for `version` with every function pattern drawn and the format
    /// and version areas reserved as light function modules.
    pub fn new(version: u8) -> Self {
        let dim = dimension(version);
        let mut matrix = Self {
            dim,
            cells: vec![DATA_WHITE; dim * dim],
        };
        matrix.draw_timing_patterns();
        matrix.draw_finder_pattern(3, 3);
        matrix.draw_finder_pattern(3, dim - 4);
        matrix.draw_finder_pattern(dim - 4, 3);
        matrix.draw_alignment_patterns(version);
        for (row, col) in format_positions(dim).into_iter().flatten() {
            matrix.set(row, col, FIXED_WHITE);
        }
        matrix.set(dim - 8, 8, FIXED_BLACK);
        if version >= 7 {
            for (row, col) in version_positions(dim).into_iter().flatten() {
                matrix.set(row, col, FIXED_WHITE);
            }
        }
        matrix
    }

    /// Side length in modules.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Cell state at a position.
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.dim + col]
    }

    /// Replace the cell state at a position.
    pub fn set(&mut self, row: usize, col: usize, state: u8) {
        self.cells[row * self.dim + col] = state;
    }

    /// Whether the module is dark.
    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        self.get(row, col) & DARK != 0
    }

    /// Whether the module belongs to a function pattern.
    pub fn is_function(&self, row: usize, col: usize) -> bool {
        self.get(row, col) & NON_DATA != 0
    }

    /// Number of dark modules.
    pub fn dark_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c & DARK != 0).count()
    }

    fn draw_timing_patterns(&mut self) {
        for i in 0..self.dim {
            let state = if i % 2 == 0 { FIXED_BLACK } else { FIXED_WHITE };
            self.set(6, i, state);
            self.set(i, 6, state);
        }
    }

    /// Finder pattern with its separator, clipped at the symbol edge.
    fn draw_finder_pattern(&mut self, row: usize, col: usize) {
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let r = row as i32 + dy;
                let c = col as i32 + dx;
                if r < 0 || c < 0 || r >= self.dim as i32 || c >= self.dim as i32 {
                    continue;
                }
                let distance = dx.abs().max(dy.abs());
                let state = if distance == 2 || distance == 4 {
                    FIXED_WHITE
                } else {
                    FIXED_BLACK
                };
                self.set(r as usize, c as usize, state);
            }
        }
    }

    fn draw_alignment_patterns(&mut self, version: u8) {
        let positions = alignment_positions(version);
        let last = positions.len().saturating_sub(1);
        for (i, &row) in positions.iter().enumerate() {
            for (j, &col) in positions.iter().enumerate() {
                // overlaps a finder pattern
                if (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0) {
                    continue;
                }
                for dy in -2i32..=2 {
                    for dx in -2i32..=2 {
                        let state = if dx.abs().max(dy.abs()) == 1 {
                            FIXED_WHITE
                        } else {
                            FIXED_BLACK
                        };
                        self.set(
                            (row as i32 + dy) as usize,
                            (col as i32 + dx) as usize,
                            state,
                        );
                    }
                }
            }
        }
    }

    /// Place codeword bits, most significant first, along the two-column
    /// zig-zag from the bottom right corner.
    ///
    /// Modules left over once the codewords run out stay light.
    pub fn place_codewords(&mut self, codewords: &[u8]) {
        let total_bits = codewords.len() * 8;
        let mut bit = 0;
        let mut right = self.dim as i32 - 1;
        while right >= 1 {
            // the vertical timing pattern shifts every pair left of it
            if right == 6 {
                right = 5;
            }
            let upward = (right + 1) & 2 == 0;
            for step in 0..self.dim {
                let row = if upward { self.dim - 1 - step } else { step };
                for offset in 0..2 {
                    let col = (right - offset) as usize;
                    if self.is_function(row, col) || bit >= total_bits {
                        continue;
                    }
                    if (codewords[bit >> 3] >> (7 - (bit & 7))) & 1 != 0 {
                        self.set(row, col, DATA_BLACK);
                    }
                    bit += 1;
                }
            }
            right -= 2;
        }
    }

    /// Copy of the grid with mask pattern `mask` XORed over the data modules.
    pub fn masked(&self, mask: u8) -> Self {
        let mut result = self.clone();
        for row in 0..self.dim {
            for col in 0..self.dim {
                let index = row * self.dim + col;
                if result.cells[index] & NON_DATA == 0 && mask_bit(mask, row, col) {
                    result.cells[index] ^= DARK;
                }
            }
        }
        result
    }

    /// Overlay the format word for a level and mask in both copies.
    pub fn draw_format_info(&mut self, level: QrErrorCorrection, mask: u8) {
        let bits = format_bits(level, mask);
        for copy in format_positions(self.dim) {
            for (i, (row, col)) in copy.into_iter().enumerate() {
                let state = if (bits >> i) & 1 != 0 {
                    FIXED_BLACK
                } else {
                    FIXED_WHITE
                };
                self.set(row, col, state);
            }
        }
    }

    /// Overlay the version word in both corner blocks. No-op below version 7.
    pub fn draw_version_info(&mut self, version: u8) {
        if version < 7 {
            return;
        }
        let bits = version_bits(version);
        for copy in version_positions(self.dim) {
            for (i, (row, col)) in copy.into_iter().enumerate() {
                let state = if (bits >> i) & 1 != 0 {
                    FIXED_BLACK
                } else {
                    FIXED_WHITE
                };
                self.set(row, col, state);
            }
        }
    }
}

/// Whether mask pattern `mask` inverts the module at a position.
pub fn mask_bit(mask: u8, row: usize, col: usize) -> bool {
    let (i, j) = (row, col);
    match mask {
        0 => (i + j) % 2 == 0,
        1 => i % 2 == 0,
        2 => j % 3 == 0,
        3 => (i + j) % 3 == 0,
        4 => (i / 2 + j / 3) % 2 == 0,
        5 => (i * j) % 2 + (i * j) % 3 == 0,
        6 => ((i * j) % 2 + (i * j) % 3) % 2 == 0,
        7 => ((i + j) % 2 + (i * j) % 3) % 2 == 0,
        _ => false,
    }
}

/// Positions of format bits 0 to 14, beside the top left finder and split
/// between the other two finders.
fn format_positions(dim: usize) -> [[(usize, usize); 15]; 2] {
    let mut first = [(0, 0); 15];
    let mut second = [(0, 0); 15];
    for i in 0..15 {
        first[i] = match i {
            0..=5 => (i, 8),
            6 => (7, 8),
            7 => (8, 8),
            8 => (8, 7),
            _ => (8, 14 - i),
        };
        second[i] = if i < 8 {
            (8, dim - 1 - i)
        } else {
            (dim - 15 + i, 8)
        };
    }
    [first, second]
}

/// Positions of version bits 0 to 17, above the bottom left finder and left
/// of the top right one.
fn version_positions(dim: usize) -> [[(usize, usize); 18]; 2] {
    let mut top_right = [(0, 0); 18];
    let mut bottom_left = [(0, 0); 18];
    for i in 0..18 {
        top_right[i] = (i / 3, dim - 11 + i % 3);
        bottom_left[i] = (dim - 11 + i % 3, i / 3);
    }
    [top_right, bottom_left]
}
