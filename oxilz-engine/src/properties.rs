//! Serialized LZMA properties.
//!
//! The canonical 5-byte block is one properties byte packing `lc`, `lp` and
//! `pb` as `(pb * 5 + lp) * 9 + lc`, followed by the dictionary size as a
//! little-endian u32.

use oxilz_core::error::{OxiLzError, Result};
use oxilz_core::props::PropertyId;
use oxilz_core::traits::PROPERTIES_SIZE;

/// Maximum literal context bits.
pub const LC_MAX: u32 = 8;
/// Maximum literal position bits.
pub const LP_MAX: u32 = 4;
/// Maximum position bits.
pub const PB_MAX: u32 = 4;

/// Literal context bits used when nothing else is configured.
pub const LC_DEFAULT: u32 = 3;
/// Literal position bits used when nothing else is configured.
pub const LP_DEFAULT: u32 = 0;
/// Position bits used when nothing else is configured.
pub const PB_DEFAULT: u32 = 2;

/// LZMA properties (lc, lp, pb).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LzmaProperties {
    /// Literal context bits.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits.
    pub pb: u32,
}

impl LzmaProperties {
    /// Create new properties. Values are not range checked.
    pub fn new(lc: u32, lp: u32, pb: u32) -> Self {
        Self { lc, lp, pb }
    }

    /// Parse from the properties byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let mut d = byte as u32;
        if d >= (PB_MAX + 1) * (LP_MAX + 1) * (LC_MAX + 1) {
            return None;
        }
        let lc = d % 9;
        d /= 9;
        let lp = d % 5;
        let pb = d / 5;
        Some(Self { lc, lp, pb })
    }

    /// Encode to the properties byte.
    pub fn to_byte(&self) -> u8 {
        ((self.pb * 5 + self.lp) * 9 + self.lc) as u8
    }

    /// Number of literal probability tables.
    pub fn num_lit_states(&self) -> usize {
        1 << (self.lc + self.lp)
    }

    /// Number of position states.
    pub fn num_pos_states(&self) -> usize {
        1 << self.pb
    }
}

impl Default for LzmaProperties {
    fn default() -> Self {
        Self {
            lc: LC_DEFAULT,
            lp: LP_DEFAULT,
            pb: PB_DEFAULT,
        }
    }
}

/// The canonical 5-byte property block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyBlock {
    /// Literal/position bits.
    pub props: LzmaProperties,
    /// Dictionary size in bytes.
    pub dict_size: u32,
}

impl PropertyBlock {
    /// Serialize the block.
    pub fn to_bytes(&self) -> [u8; PROPERTIES_SIZE] {
        let mut out = [0u8; PROPERTIES_SIZE];
        out[0] = self.props.to_byte();
        out[1..].copy_from_slice(&self.dict_size.to_le_bytes());
        out
    }

    /// Parse a block. The slice must be exactly [`PROPERTIES_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; PROPERTIES_SIZE] = bytes.try_into().map_err(|_| {
            OxiLzError::invalid_usage(format!(
                "property block must be {PROPERTIES_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;

        let props = LzmaProperties::from_byte(bytes[0]).ok_or_else(|| {
            OxiLzError::invalid_parameter(
                PropertyId::LitContextBits,
                format!("properties byte {:#04x} out of range", bytes[0]),
            )
        })?;
        let dict_size = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);

        Ok(Self { props, dict_size })
    }
}
