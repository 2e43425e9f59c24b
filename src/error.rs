//! Error types for the embedding codecs.
//!
//! This module defines all error types that can occur while subsetting a
//! TrueType font or encoding a QR Code symbol. Every error is fatal for the
//! operation that raised it: no partial output is ever returned.

use crate::fonts::Tag;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during font subsetting and QR encoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required font table (anything but `cvt`, `fpgm` and `prep`) is absent
    #[error("Required font table is missing: '{0}'")]
    MissingTable(Tag),

    /// The table directory lists the same known table twice
    #[error("Font file contains a duplicate '{0}' table")]
    DuplicateTable(Tag),

    /// No Windows cmap sub-table in format 4 or format 0 for the wanted encoding
    #[error("Required cmap sub-table is missing (platform 3, encoding {encoding_id}, format 4 or 0)")]
    NoUsableCmap {
        /// Encoding ID that was searched for (0 symbolic, 1 Unicode)
        encoding_id: u16,
    },

    /// Structurally invalid font data
    #[error("Malformed font: {0}")]
    MalformedFont(String),

    /// The font metrics source reported a failure
    #[error("Font source error: {0}")]
    FontSource(String),

    /// IO error raised by an I/O backed font source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller asked for an impossible subset
    #[error("Invalid subset request: {0}")]
    InvalidSubsetRequest(String),

    /// QR input string (or every segment of it) is empty
    #[error("QR input data string is empty")]
    EmptyQrInput,

    /// QR input holds a character outside 0-255
    #[error("QR input character U+{0:04X} is outside the range 0 to 255")]
    InvalidQrCharacter(u32),

    /// QR input does not fit a version 40 symbol
    #[error("QR input is too long: {bits} bits exceed the version 40 capacity of {capacity} bits at level {level}")]
    QrInputTooLong {
        /// Bits required to encode the input at version 40
        bits: usize,
        /// Data bits available at version 40
        capacity: usize,
        /// Requested error correction level
        level: char,
    },

    /// Internal consistency check failed (a bug, never expected in correct operation)
    #[error("Internal consistency error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a [`Error::MalformedFont`] caused by a table that ends early.
    pub(crate) fn truncated(tag: Tag) -> Self {
        Error::MalformedFont(format!("'{}' table is truncated", tag))
    }
}
