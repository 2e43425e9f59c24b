//! Reed-Solomon error correction over GF(256).
//!
//! The field uses the QR Code reducing polynomial x^8 + x^4 + x^3 + x^2 + 1.
//! Log/antilog tables and the generator polynomials for every block size
//! a symbol can use are built once on first use.

use lazy_static::lazy_static;

/// Reducing polynomial of the field, without the x^8 term.
const REDUCING_POLYNOMIAL: u16 = 0x11D;
/// Fewest error correction codewords any block carries.
pub const MIN_EC_CODEWORDS: usize = 7;
/// Most error correction codewords any block carries.
pub const MAX_EC_CODEWORDS: usize = 30;

struct GaloisField {
    exp: [u8; 255],
    log: [u8; 256],
}

impl GaloisField {
    fn new() -> Self {
        let mut exp = [0u8; 255];
        let mut log = [0u8; 256];
        let mut value: u16 = 1;
        for (power, slot) in exp.iter_mut().enumerate() {
            *slot = value as u8;
            log[value as usize] = power as u8;
            value <<= 1;
            if value & 0x100 != 0 {
                value ^= REDUCING_POLYNOMIAL;
            }
        }
        Self { exp, log }
    }

    fn multiply(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        let sum = self.log[a as usize] as usize + self.log[b as usize] as usize;
        self.exp[sum % 255]
    }
}

/// Coefficients of the monic generator polynomial of a degree, highest power
/// first with the leading 1 dropped.
fn generator_polynomial(field: &GaloisField, degree: usize) -> Vec<u8> {
    let mut result = vec![0u8; degree];
    result[degree - 1] = 1;
    let mut root = 1u8;
    for _ in 0..degree {
        for j in 0..degree {
            result[j] = field.multiply(result[j], root);
            if j + 1 < degree {
                result[j] ^= result[j + 1];
            }
        }
        root = field.multiply(root, 0x02);
    }
    result
}

lazy_static! {
    static ref FIELD: GaloisField = GaloisField::new();
    static ref GENERATORS: Vec<Vec<u8>> = (MIN_EC_CODEWORDS..=MAX_EC_CODEWORDS)
        .map(|degree| generator_polynomial(&FIELD, degree))
        .collect();
}

/// Product of two field elements.
pub fn gf_multiply(a: u8, b: u8) -> u8 {
    FIELD.multiply(a, b)
}

/// Generator polynomial for a block with `ec_codewords` correction codewords.
///
/// Returns `None` outside the sizes QR Code symbols use.
pub fn generator(ec_codewords: usize) -> Option<&'static [u8]> {
    if !(MIN_EC_CODEWORDS..=MAX_EC_CODEWORDS).contains(&ec_codewords) {
        return None;
    }
    Some(&GENERATORS[ec_codewords - MIN_EC_CODEWORDS])
}

/// Error correction codewords of one data block.
///
/// Polynomial division of the data, shifted up by the generator degree,
/// by the generator; the remainder is the result.
pub fn remainder(data: &[u8], generator: &[u8]) -> Vec<u8> {
    let mut result = vec![0u8; generator.len()];
    for &byte in data {
        let factor = byte ^ result[0];
        result.rotate_left(1);
        if let Some(last) = result.last_mut() {
            *last = 0;
        }
        for (slot, &coefficient) in result.iter_mut().zip(generator) {
            *slot ^= FIELD.multiply(coefficient, factor);
        }
    }
    result
}
