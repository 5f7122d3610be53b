//! # OxiLZ Core
//!
//! Core components shared by the OxiLZ engine and container crates:
//!
//! - [`props`]: typed coder properties ([`PropertyId`], [`PropertyValue`],
//!   [`PropertySet`])
//! - [`traits`]: the coder contract ([`StreamCoder`], [`SetCoderProperties`],
//!   [`WriteCoderProperties`], [`SetDecoderProperties`]) and progress sinks
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Container (oxilz)                                       │
//! │     CodecConfig, 13-byte header, compress/decompress    │
//! ├─────────────────────────────────────────────────────────┤
//! │ Engine (oxilz-engine)                                   │
//! │     LZMA range coder, match finder, encoder/decoder     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Contract (this crate)                                   │
//! │     property model, coder traits, errors                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxilz_core::{PropertyId, PropertySet};
//!
//! let props = PropertySet::new()
//!     .with(PropertyId::DictionarySize, 1u32 << 20)?
//!     .with(PropertyId::MatchFinder, "bt4")?
//!     .with(PropertyId::EndMarker, false)?;
//! assert_eq!(props.len(), 3);
//! # Ok::<(), oxilz_core::OxiLzError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod props;
pub mod traits;

// Re-exports for convenience
pub use error::{OxiLzError, Result};
pub use props::{PropertyId, PropertySet, PropertyValue, ValueKind};
pub use traits::{
    CodingStats, PROPERTIES_SIZE, ProgressRecorder, ProgressSink, SetCoderProperties,
    SetDecoderProperties, StreamCoder, WriteCoderProperties,
};
