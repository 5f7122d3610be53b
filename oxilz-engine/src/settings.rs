//! Encoder settings and their property-set validation.

use crate::model::MATCH_LEN_MAX;
use crate::properties::{
    LC_DEFAULT, LC_MAX, LP_DEFAULT, LP_MAX, LzmaProperties, PB_DEFAULT, PB_MAX,
};
use oxilz_core::error::{OxiLzError, Result};
use oxilz_core::props::{PropertyId, PropertySet, PropertyValue};
use std::fmt;
use std::ops::RangeInclusive;

/// Smallest accepted dictionary size.
pub const DICT_SIZE_MIN: u32 = 1 << 12;
/// Largest accepted dictionary size.
pub const DICT_SIZE_MAX: u32 = 1 << 30;
/// Dictionary size used when nothing else is configured.
pub const DICT_SIZE_DEFAULT: u32 = 1 << 22;

/// Smallest accepted number of fast bytes.
pub const NUM_FAST_BYTES_MIN: u32 = 5;
/// Fast bytes used when nothing else is configured.
pub const NUM_FAST_BYTES_DEFAULT: u32 = 32;

/// Largest accepted match finder cycle count.
pub const MATCH_FINDER_CYCLES_MAX: u32 = 1 << 30;

/// Largest accepted thread count.
pub const NUM_THREADS_MAX: u32 = 2;

/// Match finder strategy.
///
/// All strategies walk hash chains; they differ in how many leading bytes are
/// hashed and in their default search depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchFinderKind {
    /// Binary-tree style search keyed on 2 bytes.
    Bt2,
    /// Binary-tree style search keyed on 3 bytes.
    Bt3,
    /// Binary-tree style search keyed on 4 bytes.
    Bt4,
    /// Hash-chain search keyed on 4 bytes.
    Hc4,
}

impl MatchFinderKind {
    /// Parse a match finder name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bt2" => Some(Self::Bt2),
            "bt3" => Some(Self::Bt3),
            "bt4" => Some(Self::Bt4),
            "hc4" => Some(Self::Hc4),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bt2 => "bt2",
            Self::Bt3 => "bt3",
            Self::Bt4 => "bt4",
            Self::Hc4 => "hc4",
        }
    }

    /// Number of leading bytes hashed to find candidates.
    pub fn hash_bytes(self) -> usize {
        match self {
            Self::Bt2 => 2,
            Self::Bt3 => 3,
            Self::Bt4 | Self::Hc4 => 4,
        }
    }

    /// Default search depth for a given number of fast bytes.
    pub fn default_cycles(self, num_fast_bytes: u32) -> u32 {
        match self {
            Self::Hc4 => 8 + num_fast_bytes / 4,
            _ => 16 + num_fast_bytes / 2,
        }
    }
}

impl fmt::Display for MatchFinderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Greedy parsing: take the best match at each position.
    Fast,
    /// Greedy parsing with one step of lazy evaluation.
    Normal,
}

impl Algorithm {
    /// Map the numeric property value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Fast),
            1 => Some(Self::Normal),
            _ => None,
        }
    }

    /// Numeric property value.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Fast => 0,
            Self::Normal => 1,
        }
    }
}

/// Complete encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Dictionary size in bytes.
    pub dict_size: u32,
    /// Literal/position bits.
    pub props: LzmaProperties,
    /// Match length at which the search stops early.
    pub num_fast_bytes: u32,
    /// Match finder strategy.
    pub match_finder: MatchFinderKind,
    /// Search depth; `None` derives it from the match finder.
    pub match_finder_cycles: Option<u32>,
    /// Parsing strategy.
    pub algorithm: Algorithm,
    /// Whether an end-of-stream marker terminates the payload.
    pub end_marker: bool,
    /// Requested worker count. Recorded only; coding is single threaded.
    pub num_threads: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            dict_size: DICT_SIZE_DEFAULT,
            props: LzmaProperties::new(LC_DEFAULT, LP_DEFAULT, PB_DEFAULT),
            num_fast_bytes: NUM_FAST_BYTES_DEFAULT,
            match_finder: MatchFinderKind::Bt4,
            match_finder_cycles: None,
            algorithm: Algorithm::Normal,
            end_marker: false,
            num_threads: 1,
        }
    }
}

fn uint_in(id: PropertyId, value: &PropertyValue, range: RangeInclusive<u32>) -> Result<u32> {
    let v = value
        .as_u32()
        .ok_or_else(|| OxiLzError::invalid_parameter(id, format!("expected integer, got {value}")))?;
    if !range.contains(&v) {
        return Err(OxiLzError::invalid_parameter(
            id,
            format!("{v} outside {}..={}", range.start(), range.end()),
        ));
    }
    Ok(v)
}

impl EncoderSettings {
    /// Apply a property set. On error `self` is left untouched.
    pub fn apply(&mut self, set: &PropertySet) -> Result<()> {
        let mut next = self.clone();

        for (id, value) in set.iter() {
            match id {
                PropertyId::DictionarySize => {
                    next.dict_size = uint_in(id, value, DICT_SIZE_MIN..=DICT_SIZE_MAX)?;
                }
                PropertyId::PosStateBits => {
                    next.props.pb = uint_in(id, value, 0..=PB_MAX)?;
                }
                PropertyId::LitContextBits => {
                    next.props.lc = uint_in(id, value, 0..=LC_MAX)?;
                }
                PropertyId::LitPosBits => {
                    next.props.lp = uint_in(id, value, 0..=LP_MAX)?;
                }
                PropertyId::NumFastBytes => {
                    next.num_fast_bytes =
                        uint_in(id, value, NUM_FAST_BYTES_MIN..=MATCH_LEN_MAX as u32)?;
                }
                PropertyId::MatchFinder => {
                    let name = value.as_symbol().ok_or_else(|| {
                        OxiLzError::invalid_parameter(id, format!("expected symbol, got {value}"))
                    })?;
                    next.match_finder = MatchFinderKind::from_name(name).ok_or_else(|| {
                        OxiLzError::invalid_parameter(id, format!("unknown match finder {name:?}"))
                    })?;
                }
                PropertyId::MatchFinderCycles => {
                    next.match_finder_cycles =
                        Some(uint_in(id, value, 1..=MATCH_FINDER_CYCLES_MAX)?);
                }
                PropertyId::Algorithm => {
                    let v = uint_in(id, value, 0..=1)?;
                    next.algorithm = Algorithm::from_u32(v).unwrap_or(Algorithm::Normal);
                }
                PropertyId::EndMarker => {
                    next.end_marker = value.as_bool().ok_or_else(|| {
                        OxiLzError::invalid_parameter(id, format!("expected boolean, got {value}"))
                    })?;
                }
                PropertyId::NumThreads => {
                    next.num_threads = uint_in(id, value, 1..=NUM_THREADS_MAX)?;
                }
                PropertyId::DefaultProp
                | PropertyId::UsedMemorySize
                | PropertyId::Order
                | PropertyId::BlockSize
                | PropertyId::NumPasses => {
                    return Err(OxiLzError::invalid_parameter(
                        id,
                        "not supported by the LZMA encoder",
                    ));
                }
            }
        }

        *self = next;
        Ok(())
    }

    /// Effective search depth.
    pub fn cycles(&self) -> u32 {
        self.match_finder_cycles
            .unwrap_or_else(|| self.match_finder.default_cycles(self.num_fast_bytes))
    }
}
