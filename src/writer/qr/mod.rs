//! QR Code symbol encoder.
//!
//! Encoding runs as a fixed pipeline over one input:
//!
//! ```text
//! segments → version → bit packing → error correction → interleaving
//!          → placement → mask selection → format/version overlay
//! ```
//!
//! The result is an immutable [`QrCode`]: a grid of dark/light modules with
//! a quiet zone around it, ready to be rasterized as a 1-bit image.

pub mod mask;
pub mod matrix;
pub mod reed_solomon;
pub mod segment;
pub mod tables;

pub use mask::evaluate_penalty;
pub use matrix::QrMatrix;
pub use segment::{QrMode, QrSegment};

use segment::BitBuffer;
use tables::{block_layout, data_capacity_bits, total_codewords, MAX_VERSION, MIN_VERSION};

use crate::error::{Error, Result};
use crate::writer::barcode::QrErrorCorrection;

/// Pad codewords filling unused data capacity, in turn.
const PAD_CODEWORDS: [u8; 2] = [0xEC, 0x11];
/// Longest terminator written after the last segment.
const TERMINATOR_BITS: usize = 4;

/// An encoded QR Code symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCode {
    version: u8,
    level: QrErrorCorrection,
    mask: u8,
    penalty_score: u32,
    dimension: usize,
    quiet_zone: usize,
    /// Row-major modules of the symbol including its quiet zone
    modules: Vec<bool>,
    codewords: Vec<u8>,
    segment_modes: Vec<QrMode>,
}

impl QrCode {
    /// Encode segments at an error correction level.
    ///
    /// Empty segments are skipped. The smallest version holding every
    /// segment is chosen.
    ///
    /// # Errors
    ///
    /// * [`Error::EmptyQrInput`] if no segment holds any data
    /// * [`Error::QrInputTooLong`] if the data does not fit a version 40 symbol
    pub fn encode_segments(
        segments: &[QrSegment],
        level: QrErrorCorrection,
        quiet_zone: usize,
    ) -> Result<Self> {
        let segments: Vec<&QrSegment> = segments.iter().filter(|s| s.char_count() > 0).collect();
        if segments.is_empty() {
            return Err(Error::EmptyQrInput);
        }

        let version = select_version(&segments, level)?;
        let data = pack_data(&segments, version, level)?;
        let codewords = add_error_correction(&data, version, level)?;

        let mut placed = QrMatrix::new(version);
        placed.place_codewords(&codewords);
        let (mut matrix, mask, penalty_score) = mask::select_mask(&placed);
        matrix.draw_format_info(level, mask);
        matrix.draw_version_info(version);

        let dimension = matrix.dim();
        let full = dimension + 2 * quiet_zone;
        let mut modules = vec![false; full * full];
        for row in 0..dimension {
            for col in 0..dimension {
                modules[(row + quiet_zone) * full + col + quiet_zone] = matrix.is_dark(row, col);
            }
        }

        log::debug!(
            "Encoded QR code: version {}, level {}, mask {}, penalty {}, {} segments",
            version,
            level,
            mask,
            penalty_score,
            segments.len()
        );
        Ok(Self {
            version,
            level,
            mask,
            penalty_score,
            dimension,
            quiet_zone,
            modules,
            codewords,
            segment_modes: segments.iter().map(|s| s.mode()).collect(),
        })
    }

    /// Symbol version, 1 to 40.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Error correction level.
    pub fn error_correction(&self) -> QrErrorCorrection {
        self.level
    }

    /// Committed mask pattern, 0 to 7.
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Penalty of the committed mask.
    pub fn penalty_score(&self) -> u32 {
        self.penalty_score
    }

    /// Side length of the symbol without quiet zone.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Quiet zone width in modules.
    pub fn quiet_zone(&self) -> usize {
        self.quiet_zone
    }

    /// Side length including the quiet zone on both sides.
    pub fn full_dimension(&self) -> usize {
        self.dimension + 2 * self.quiet_zone
    }

    /// Whether the module at a position of the quiet-zoned grid is dark.
    ///
    /// Positions outside the grid are light.
    pub fn is_dark(&self, row: usize, col: usize) -> bool {
        let full = self.full_dimension();
        row < full && col < full && self.modules[row * full + col]
    }

    /// The quiet-zoned grid as rows of modules, `true` for dark.
    pub fn to_matrix(&self) -> Vec<Vec<bool>> {
        self.modules
            .chunks(self.full_dimension())
            .map(|row| row.to_vec())
            .collect()
    }

    /// Interleaved data and error correction codewords, in placement order.
    pub fn codewords(&self) -> &[u8] {
        &self.codewords
    }

    /// Mode of every encoded segment, in order.
    pub fn segment_modes(&self) -> &[QrMode] {
        &self.segment_modes
    }
}

/// Smallest version whose data capacity holds every segment.
fn select_version(segments: &[&QrSegment], level: QrErrorCorrection) -> Result<u8> {
    for version in MIN_VERSION..=MAX_VERSION {
        let required: Option<usize> = segments.iter().map(|s| s.total_bits(version)).sum();
        if let Some(bits) = required {
            if bits <= data_capacity_bits(version, level) {
                return Ok(version);
            }
        }
    }
    let bits: usize = segments
        .iter()
        .map(|s| s.encoded_bits() + s.mode().count_bits(MAX_VERSION))
        .sum();
    Err(Error::QrInputTooLong {
        bits,
        capacity: data_capacity_bits(MAX_VERSION, level),
        level: level.as_char(),
    })
}

/// Segments, terminator and padding, as data codewords.
fn pack_data(segments: &[&QrSegment], version: u8, level: QrErrorCorrection) -> Result<Vec<u8>> {
    let capacity = data_capacity_bits(version, level);
    let mut bits = BitBuffer::with_capacity(capacity / 8);
    for segment in segments {
        segment.write_to(&mut bits, version);
    }
    if bits.bit_len() > capacity {
        return Err(Error::Internal(format!(
            "packed {} bits into a symbol holding {}",
            bits.bit_len(),
            capacity
        )));
    }
    bits.push(0, TERMINATOR_BITS.min(capacity - bits.bit_len()));
    bits.align();

    let mut data = bits.into_bytes();
    for pad in PAD_CODEWORDS.iter().cycle() {
        if data.len() >= capacity / 8 {
            break;
        }
        data.push(*pad);
    }
    Ok(data)
}

/// Split data codewords into blocks, append their error correction
/// codewords and interleave everything in transmission order.
fn add_error_correction(data: &[u8], version: u8, level: QrErrorCorrection) -> Result<Vec<u8>> {
    let layout = block_layout(version, level);
    if data.len() != layout.data_codewords() {
        return Err(Error::Internal(format!(
            "{} data codewords for a symbol holding {}",
            data.len(),
            layout.data_codewords()
        )));
    }
    let generator = reed_solomon::generator(layout.ec_per_block).ok_or_else(|| {
        Error::Internal(format!(
            "no generator polynomial of degree {}",
            layout.ec_per_block
        ))
    })?;

    let mut blocks = Vec::with_capacity(layout.num_blocks);
    let mut offset = 0;
    for i in 0..layout.num_blocks {
        let len = if i < layout.group1_blocks {
            layout.group1_data
        } else {
            layout.group2_data()
        };
        let block = &data[offset..offset + len];
        blocks.push((block, reed_solomon::remainder(block, generator)));
        offset += len;
    }

    let mut result = Vec::with_capacity(total_codewords(version));
    // group 2 blocks are one codeword longer; the last column only they fill
    for i in 0..layout.group2_data() {
        for (block, _) in &blocks {
            if let Some(&codeword) = block.get(i) {
                result.push(codeword);
            }
        }
    }
    for i in 0..layout.ec_per_block {
        for (_, ec) in &blocks {
            result.push(ec[i]);
        }
    }
    if result.len() != total_codewords(version) {
        return Err(Error::Internal(format!(
            "interleaved {} codewords for a symbol holding {}",
            result.len(),
            total_codewords(version)
        )));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str, level: QrErrorCorrection) -> QrCode {
        let segment = QrSegment::new(text).unwrap();
        QrCode::encode_segments(&[segment], level, 4).unwrap()
    }

    #[test]
    fn test_numeric_version_1() {
        let code = encode("01234567", QrErrorCorrection::Medium);
        assert_eq!(code.version(), 1);
        assert_eq!(code.dimension(), 21);
        assert_eq!(code.full_dimension(), 29);
        assert_eq!(code.segment_modes(), &[QrMode::Numeric]);
        assert_eq!(code.codewords().len(), 26);

        let again = encode("01234567", QrErrorCorrection::Medium);
        assert_eq!(code, again);
    }

    #[test]
    fn test_numeric_data_codewords() {
        let segment = QrSegment::new("01234567").unwrap();
        let data = pack_data(&[&segment], 1, QrErrorCorrection::Medium).unwrap();
        assert_eq!(
            data,
            vec![
                0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC,
                0x11, 0xEC, 0x11
            ]
        );
    }

    #[test]
    fn test_hello_world_codewords() {
        let code = encode("HELLO WORLD", QrErrorCorrection::Medium);
        assert_eq!(code.version(), 1);
        assert_eq!(
            code.codewords(),
            &[
                0x20, 0x5B, 0x0B, 0x78, 0xD1, 0x72, 0xDC, 0x4D, 0x43, 0x40, 0xEC, 0x11, 0xEC,
                0x11, 0xEC, 0x11, 0xC4, 0x23, 0x27, 0x77, 0xEB, 0xD7, 0xE7, 0xE2, 0x5D, 0x17
            ][..]
        );
    }

    #[test]
    fn test_terminator_truncated_at_capacity() {
        // 17 bytes in version 1-L: 4 + 8 + 136 = 148 of 152 bits
        let segment = QrSegment::from_bytes(&[b'a'; 17]);
        let data = pack_data(&[&segment], 1, QrErrorCorrection::Low).unwrap();
        assert_eq!(data.len(), 19);
        assert_eq!(data[18], 0x10);
    }

    #[test]
    fn test_interleaving_two_groups() {
        let layout = block_layout(5, QrErrorCorrection::Quartile);
        let data: Vec<u8> = (0..layout.data_codewords() as u8).collect();
        let codewords = add_error_correction(&data, 5, QrErrorCorrection::Quartile).unwrap();
        // blocks start at 0, 15, 30, 46
        assert_eq!(&codewords[..8], &[0, 15, 30, 46, 1, 16, 31, 47]);
        // the extra column holds only the group 2 blocks
        assert_eq!(&codewords[60..62], &[45, 61]);
        assert_eq!(codewords.len(), 134);
    }

    #[test]
    fn test_committed_mask_rescores_to_stored_penalty() {
        for text in ["01234567", "HELLO WORLD", "https://example.com/?q=1"] {
            let code = encode(text, QrErrorCorrection::Quartile);
            let mut placed = QrMatrix::new(code.version());
            placed.place_codewords(code.codewords());
            let masked = placed.masked(code.mask());
            assert_eq!(evaluate_penalty(&masked), code.penalty_score(), "{}", text);
        }
    }

    #[test]
    fn test_empty_segments_are_dropped() {
        let segments = [
            QrSegment::new("").unwrap(),
            QrSegment::new("ABC").unwrap(),
            QrSegment::new("").unwrap(),
        ];
        let code = QrCode::encode_segments(&segments, QrErrorCorrection::Low, 0).unwrap();
        assert_eq!(code.segment_modes(), &[QrMode::AlphaNumeric]);
        assert_eq!(code.full_dimension(), 21);

        let empty = [QrSegment::new("").unwrap()];
        assert!(matches!(
            QrCode::encode_segments(&empty, QrErrorCorrection::Low, 4),
            Err(Error::EmptyQrInput)
        ));
    }

    #[test]
    fn test_quiet_zone_is_light() {
        let code = encode("QUIET", QrErrorCorrection::High);
        let full = code.full_dimension();
        for i in 0..full {
            for q in 0..4 {
                assert!(!code.is_dark(q, i));
                assert!(!code.is_dark(i, q));
                assert!(!code.is_dark(full - 1 - q, i));
                assert!(!code.is_dark(i, full - 1 - q));
            }
        }
        // top left finder corner
        assert!(code.is_dark(4, 4));
        assert!(!code.is_dark(full, 4));
        assert_eq!(code.to_matrix().len(), full);
    }

    #[test]
    fn test_version_7_has_version_info() {
        let code = encode(&"x".repeat(100), QrErrorCorrection::Low);
        assert_eq!(code.version(), 5);
        // 1212 bits: more than 6-L holds, less than 7-L
        let code = encode(&"x".repeat(150), QrErrorCorrection::Low);
        assert_eq!(code.version(), 7);
        let dim = code.dimension();
        let q = code.quiet_zone();
        // 0x07C94, bit 2 at row 0 column dim-9
        assert!(code.is_dark(q, q + dim - 9));
        assert!(!code.is_dark(q, q + dim - 11));
    }

    #[test]
    fn test_input_too_long() {
        let segment = QrSegment::from_bytes(&vec![b'a'; 3000]);
        let result = QrCode::encode_segments(&[segment], QrErrorCorrection::Low, 4);
        match result {
            Err(Error::QrInputTooLong {
                bits,
                capacity,
                level,
            }) => {
                assert_eq!(bits, 4 + 16 + 24000);
                assert_eq!(capacity, 2956 * 8);
                assert_eq!(level, 'L');
            },
            other => panic!("expected QrInputTooLong, got {:?}", other),
        }
    }
}
