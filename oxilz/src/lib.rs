//! # OxiLZ
//!
//! LZMA container codec. A container is a 13-byte header (the 5-byte coder
//! property block and the uncompressed length as u64 LE) followed by a raw
//! LZMA payload.
//!
//! ## Usage
//!
//! ```rust
//! use oxilz::{CodecConfig, DecompressStatus, LzmaCodec};
//! use std::io::Cursor;
//!
//! let codec = LzmaCodec::new(CodecConfig::from_level(6)?);
//! let data = b"The quick brown fox jumps over the lazy dog. ".repeat(10);
//!
//! let mut packed = Vec::new();
//! codec.compress(Cursor::new(&data), &mut packed, None)?;
//!
//! let mut unpacked = Vec::new();
//! let status = codec.decompress(Cursor::new(&packed), &mut unpacked, None)?;
//! assert_eq!(status, DecompressStatus::Complete { uncompressed_size: data.len() as u64 });
//! assert_eq!(unpacked, data);
//! # Ok::<(), oxilz::OxiLzError>(())
//! ```
//!
//! For byte slices, [`compress_bytes`] and [`decompress_bytes`] wrap the
//! codec with the default configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod header;

// Re-exports
pub use codec::{DecompressStatus, LzmaCodec};
pub use config::CodecConfig;
pub use header::{ContainerHeader, ContainerInfo, HEADER_SIZE, HeaderRead, read_header};
pub use oxilz_core::{
    CodingStats, OxiLzError, ProgressRecorder, ProgressSink, PropertyId, PropertySet,
    PropertyValue, Result,
};

use std::io::Cursor;

/// Compress a byte slice into a container using the default configuration.
pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_SIZE + data.len() / 2);
    LzmaCodec::default().compress(Cursor::new(data), &mut out, None)?;
    Ok(out)
}

/// Decompress a container held in a byte slice.
///
/// Returns `None` when the slice is shorter than the header.
pub fn decompress_bytes(data: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut out = Vec::new();
    match LzmaCodec::default().decompress(Cursor::new(data), &mut out, None)? {
        DecompressStatus::Complete { .. } => Ok(Some(out)),
        DecompressStatus::TruncatedHeader { .. } => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_helpers() {
        let data = b"helper helper helper helper";
        let packed = compress_bytes(data).unwrap();
        assert_eq!(decompress_bytes(&packed).unwrap().as_deref(), Some(&data[..]));
        assert_eq!(decompress_bytes(&packed[..12]).unwrap(), None);
    }

    #[test]
    fn test_empty_container() {
        let packed = compress_bytes(b"").unwrap();
        assert_eq!(packed.len(), HEADER_SIZE);
        assert_eq!(decompress_bytes(&packed).unwrap(), Some(Vec::new()));
    }
}
