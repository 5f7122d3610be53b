//! # OxiLZ Engine
//!
//! LZMA encoder and decoder implementing the `oxilz-core` coder contract.
//!
//! The engine produces and consumes raw LZMA streams: a range-coded payload
//! described by a separate 5-byte property block. Framing (such as the 13-byte
//! container header) is left to the caller.
//!
//! ## Components
//!
//! - [`range_coder`]: binary range coder with adaptive 11-bit probabilities
//! - [`model`]: LZMA state machine and probability tables
//! - [`match_finder`]: streaming hash-chain match finder
//! - [`settings`]: encoder settings and property validation
//! - [`encoder`] / [`decoder`]: the two stream coders
//!
//! ## Example
//!
//! ```rust
//! use oxilz_core::{PropertyId, PropertySet, SetCoderProperties, SetDecoderProperties,
//!     StreamCoder, WriteCoderProperties};
//! use oxilz_engine::{LzmaDecoder, LzmaEncoder};
//! use std::io::Cursor;
//!
//! let data = b"abracadabra abracadabra abracadabra";
//!
//! let mut encoder = LzmaEncoder::new();
//! encoder.set_coder_properties(
//!     &PropertySet::new().with(PropertyId::DictionarySize, 1u32 << 16)?,
//! )?;
//! let mut block = Vec::new();
//! encoder.write_coder_properties(&mut block)?;
//! let mut packed = Vec::new();
//! encoder.code(&mut Cursor::new(&data[..]), &mut packed, None, None, None)?;
//!
//! let mut decoder = LzmaDecoder::new();
//! decoder.set_decoder_properties(&block)?;
//! let mut unpacked = Vec::new();
//! decoder.code(
//!     &mut Cursor::new(packed),
//!     &mut unpacked,
//!     None,
//!     Some(data.len() as u64),
//!     None,
//! )?;
//! assert_eq!(unpacked, data);
//! # Ok::<(), oxilz_core::OxiLzError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod encoder;
pub mod match_finder;
pub mod model;
pub mod properties;
pub mod range_coder;
pub mod settings;

// Re-exports
pub use decoder::LzmaDecoder;
pub use encoder::LzmaEncoder;
pub use model::{LzmaModel, State};
pub use properties::{LzmaProperties, PropertyBlock};
pub use range_coder::{RangeDecoder, RangeEncoder};
pub use settings::{Algorithm, EncoderSettings, MatchFinderKind};
