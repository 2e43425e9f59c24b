//! Output-side codecs handed to a PDF writing layer.
//!
//! ## Architecture
//!
//! ```text
//! text
//!     ↓
//! [BarcodeGenerator] (segments, options)
//!     ↓
//! [QrCode] (encoder pipeline in `qr`)
//!     ↓
//! module grid → 1-bit image
//! ```

pub mod barcode;
pub mod qr;

pub use barcode::{BarcodeGenerator, QrCodeOptions, QrErrorCorrection, SEGMENT_MARKER};
pub use qr::{QrCode, QrMode, QrSegment};
