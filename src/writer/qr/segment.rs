//! Input segments and their encoding modes.

use std::fmt;

use crate::error::{Error, Result};

/// Bits of the mode indicator in front of every segment.
const MODE_INDICATOR_BITS: usize = 4;

/// Characters of the alphanumeric mode, in code order.
const ALPHANUMERIC_CHARSET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Encoding mode of a segment, from most to least compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QrMode {
    /// Decimal digits, 10 bits per 3 characters
    Numeric,
    /// Digits, upper case letters and ` $%*+-./:`, 11 bits per 2 characters
    AlphaNumeric,
    /// Any byte, 8 bits per character
    Byte,
}

impl QrMode {
    /// The 4-bit mode indicator.
    pub const fn indicator(self) -> u32 {
        match self {
            QrMode::Numeric => 0b0001,
            QrMode::AlphaNumeric => 0b0010,
            QrMode::Byte => 0b0100,
        }
    }

    /// Width of the character count field for a version.
    pub const fn count_bits(self, version: u8) -> usize {
        let tier = if version <= 9 {
            0
        } else if version <= 26 {
            1
        } else {
            2
        };
        match self {
            QrMode::Numeric => [10, 12, 14][tier],
            QrMode::AlphaNumeric => [9, 11, 13][tier],
            QrMode::Byte => [8, 16, 16][tier],
        }
    }

    /// Least compact mode able to hold `byte`.
    fn of_byte(byte: u8) -> Self {
        match alphanumeric_code(byte) {
            Some(code) if code < 10 => QrMode::Numeric,
            Some(_) => QrMode::AlphaNumeric,
            None => QrMode::Byte,
        }
    }
}

impl fmt::Display for QrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QrMode::Numeric => write!(f, "Numeric"),
            QrMode::AlphaNumeric => write!(f, "AlphaNumeric"),
            QrMode::Byte => write!(f, "Byte"),
        }
    }
}

fn alphanumeric_code(byte: u8) -> Option<u32> {
    ALPHANUMERIC_CHARSET
        .iter()
        .position(|&c| c == byte)
        .map(|code| code as u32)
}

/// MSB-first bit accumulator.
#[derive(Debug, Clone, Default)]
pub(crate) struct BitBuffer {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitBuffer {
    pub(crate) fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bits: 0,
        }
    }

    /// Append the low `count` bits of `value`, most significant first.
    pub(crate) fn push(&mut self, value: u32, count: usize) {
        debug_assert!(count <= 32);
        for i in (0..count).rev() {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 != 0 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.bits % 8);
            }
            self.bits += 1;
        }
    }

    pub(crate) fn bit_len(&self) -> usize {
        self.bits
    }

    /// Pad the partial last byte with zero bits.
    pub(crate) fn align(&mut self) {
        self.bits = self.bytes.len() * 8;
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A run of input encoded in a single mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrSegment {
    mode: QrMode,
    data: Vec<u8>,
}

impl QrSegment {
    /// Segment from text whose characters all lie in 0-255.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidQrCharacter`] for the first character above 255.
    pub fn new(text: &str) -> Result<Self> {
        let data = text
            .chars()
            .map(|c| u8::try_from(c as u32).map_err(|_| Error::InvalidQrCharacter(c as u32)))
            .collect::<Result<Vec<u8>>>()?;
        Ok(Self::from_bytes(&data))
    }

    /// Segment from raw bytes.
    ///
    /// The mode is the most compact one holding every byte; a single byte
    /// outside the alphanumeric set settles it as [`QrMode::Byte`].
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut mode = QrMode::Numeric;
        for &byte in data {
            mode = mode.max(QrMode::of_byte(byte));
            if mode == QrMode::Byte {
                break;
            }
        }
        Self {
            mode,
            data: data.to_vec(),
        }
    }

    /// Encoding mode.
    pub fn mode(&self) -> QrMode {
        self.mode
    }

    /// Raw bytes of the segment.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of characters, as written in the count field.
    pub fn char_count(&self) -> usize {
        self.data.len()
    }

    /// Bits of the mode indicator and payload, without the count field.
    pub fn encoded_bits(&self) -> usize {
        let n = self.data.len();
        let payload = match self.mode {
            QrMode::Numeric => 10 * (n / 3) + [0, 4, 7][n % 3],
            QrMode::AlphaNumeric => 11 * (n / 2) + 6 * (n % 2),
            QrMode::Byte => 8 * n,
        };
        MODE_INDICATOR_BITS + payload
    }

    /// Bits of the whole segment in a symbol of `version`, or `None` if the
    /// character count does not fit the count field.
    pub fn total_bits(&self, version: u8) -> Option<usize> {
        let count_bits = self.mode.count_bits(version);
        if self.data.len() >= 1 << count_bits {
            return None;
        }
        Some(self.encoded_bits() + count_bits)
    }

    pub(crate) fn write_to(&self, out: &mut BitBuffer, version: u8) {
        out.push(self.mode.indicator(), MODE_INDICATOR_BITS);
        out.push(self.data.len() as u32, self.mode.count_bits(version));
        match self.mode {
            QrMode::Numeric => {
                for chunk in self.data.chunks(3) {
                    let value = chunk
                        .iter()
                        .fold(0u32, |acc, &d| acc * 10 + (d - b'0') as u32);
                    out.push(value, chunk.len() * 3 + 1);
                }
            },
            QrMode::AlphaNumeric => {
                for chunk in self.data.chunks(2) {
                    let value = chunk
                        .iter()
                        .filter_map(|&c| alphanumeric_code(c))
                        .fold(0u32, |acc, code| acc * 45 + code);
                    out.push(value, chunk.len() * 5 + 1);
                }
            },
            QrMode::Byte => {
                for &byte in &self.data {
                    out.push(byte as u32, 8);
                }
            },
        }
    }
}
