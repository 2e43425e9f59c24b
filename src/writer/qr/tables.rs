//! Version and error correction tables for QR Code symbols.
//!
//! Block layouts come from ISO/IEC 18004 table 9. Everything that follows a
//! closed formula (module counts, alignment centres, BCH protected format
//! and version words) is computed instead of tabulated.

use crate::writer::barcode::QrErrorCorrection;

/// Smallest symbol version.
pub const MIN_VERSION: u8 = 1;
/// Largest symbol version.
pub const MAX_VERSION: u8 = 40;

/// Mask applied to the BCH protected format word.
const FORMAT_XOR_MASK: u32 = 0x5412;
/// Generator of the (15, 5) BCH code protecting the format word.
const FORMAT_GENERATOR: u32 = 0x537;
/// Generator of the (18, 6) Golay code protecting the version word.
const VERSION_GENERATOR: u32 = 0x1F25;

/// Error correction codewords per block, indexed by level ordinal then
/// version - 1.
const EC_CODEWORDS_PER_BLOCK: [[u8; 40]; 4] = [
    // L
    [
        7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    // M
    [
        10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ],
    // Q
    [
        13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    // H
    [
        17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
];

/// Number of error correction blocks, indexed like [`EC_CODEWORDS_PER_BLOCK`].
const NUM_EC_BLOCKS: [[u8; 40]; 4] = [
    // L
    [
        1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13,
        14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ],
    // M
    [
        1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23,
        25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ],
    // Q
    [
        1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ],
    // H
    [
        1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ],
];

/// Side length in modules of a symbol, without quiet zone.
pub const fn dimension(version: u8) -> usize {
    17 + 4 * version as usize
}

/// Modules left for codewords once every function pattern is drawn.
///
/// Includes the remainder bits that do not make up a whole codeword.
pub const fn raw_data_modules(version: u8) -> usize {
    let v = version as usize;
    let mut result = (16 * v + 128) * v + 64;
    if v >= 2 {
        let num_align = v / 7 + 2;
        result -= (25 * num_align - 10) * num_align - 55;
        if v >= 7 {
            result -= 36;
        }
    }
    result
}

/// Total codewords (data and error correction) of a symbol.
pub const fn total_codewords(version: u8) -> usize {
    raw_data_modules(version) / 8
}

/// How the codewords of one version and level split into blocks.
///
/// Group 1 holds the short blocks, group 2 the blocks carrying one more data
/// codeword. Every block has the same number of error correction codewords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// Error correction codewords per block
    pub ec_per_block: usize,
    /// Blocks in both groups
    pub num_blocks: usize,
    /// Blocks in group 1
    pub group1_blocks: usize,
    /// Data codewords of a group 1 block
    pub group1_data: usize,
}

impl BlockLayout {
    /// Data codewords of a group 2 block.
    pub const fn group2_data(&self) -> usize {
        self.group1_data + 1
    }

    /// Blocks in group 2.
    pub const fn group2_blocks(&self) -> usize {
        self.num_blocks - self.group1_blocks
    }

    /// Data codewords over all blocks.
    pub const fn data_codewords(&self) -> usize {
        self.group1_blocks * self.group1_data + self.group2_blocks() * self.group2_data()
    }
}

/// Block layout for a version and level.
pub const fn block_layout(version: u8, level: QrErrorCorrection) -> BlockLayout {
    let row = level.ordinal();
    let column = version as usize - 1;
    let ec_per_block = EC_CODEWORDS_PER_BLOCK[row][column] as usize;
    let num_blocks = NUM_EC_BLOCKS[row][column] as usize;
    let total = total_codewords(version);
    BlockLayout {
        ec_per_block,
        num_blocks,
        group1_blocks: num_blocks - total % num_blocks,
        group1_data: total / num_blocks - ec_per_block,
    }
}

/// Data codewords available for a version and level.
pub const fn data_codewords(version: u8, level: QrErrorCorrection) -> usize {
    block_layout(version, level).data_codewords()
}

/// Data bits available for a version and level.
pub const fn data_capacity_bits(version: u8, level: QrErrorCorrection) -> usize {
    data_codewords(version, level) * 8
}

/// Row and column centres of the alignment patterns, ascending.
///
/// Version 1 has none.
pub fn alignment_positions(version: u8) -> Vec<usize> {
    if version == 1 {
        return Vec::new();
    }
    let v = version as usize;
    let num_align = v / 7 + 2;
    let step = if version == 32 {
        26
    } else {
        (v * 4 + num_align * 2 + 1) / (num_align * 2 - 2) * 2
    };
    let last = dimension(version) - 7;
    let mut positions: Vec<usize> = (0..num_align - 1).map(|i| last - i * step).collect();
    positions.push(6);
    positions.reverse();
    positions
}

/// 15-bit format word for a level and mask, BCH protected and masked.
pub const fn format_bits(level: QrErrorCorrection, mask: u8) -> u16 {
    let data = (level.format_bits() as u32) << 3 | (mask as u32 & 7);
    let mut rem = data;
    let mut i = 0;
    while i < 10 {
        rem = (rem << 1) ^ ((rem >> 9) * FORMAT_GENERATOR);
        i += 1;
    }
    ((data << 10 | (rem & 0x3FF)) ^ FORMAT_XOR_MASK) as u16
}

/// 18-bit version word, Golay protected. Only drawn from version 7 on.
pub const fn version_bits(version: u8) -> u32 {
    let data = version as u32;
    let mut rem = data;
    let mut i = 0;
    while i < 12 {
        rem = (rem << 1) ^ ((rem >> 11) * VERSION_GENERATOR);
        i += 1;
    }
    data << 12 | (rem & 0xFFF)
}
