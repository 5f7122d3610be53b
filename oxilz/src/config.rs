//! Codec configuration.

use oxilz_core::error::{OxiLzError, Result};
use oxilz_core::props::{PropertyId, PropertySet};
use oxilz_engine::EncoderSettings;
use serde::{Deserialize, Serialize};

/// Highest compression level accepted by [`CodecConfig::from_level`].
pub const LEVEL_MAX: u32 = 9;

/// Encoder configuration used by [`LzmaCodec`](crate::LzmaCodec).
///
/// Every field maps to one coder property. Missing fields in a JSON document
/// take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Dictionary size in bytes (`1 << 12 ..= 1 << 30`).
    pub dict_size: u32,
    /// Position bits, `pb` (0..=4).
    pub pos_state_bits: u32,
    /// Literal context bits, `lc` (0..=8).
    pub lit_context_bits: u32,
    /// Literal position bits, `lp` (0..=4).
    pub lit_pos_bits: u32,
    /// Parsing strategy: 0 = fast, 1 = normal.
    pub algorithm: u32,
    /// Match length that ends a search early (5..=273).
    pub num_fast_bytes: u32,
    /// Match finder name: `bt2`, `bt3`, `bt4` or `hc4`.
    pub match_finder: String,
    /// Terminate the payload with an end marker.
    pub end_marker: bool,
    /// Match finder search depth; unset uses the engine default.
    pub match_finder_cycles: Option<u32>,
    /// Requested thread count (1..=2); recorded by the engine only.
    pub num_threads: Option<u32>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            dict_size: 1 << 16,
            pos_state_bits: 2,
            lit_context_bits: 3,
            lit_pos_bits: 0,
            algorithm: 1,
            num_fast_bytes: 32,
            match_finder: "bt4".to_string(),
            end_marker: false,
            match_finder_cycles: None,
            num_threads: None,
        }
    }
}

impl CodecConfig {
    /// Preset for a compression level (0 = fastest, 9 = best).
    ///
    /// Levels below 5 use fast parsing with `hc4`; higher levels use normal
    /// parsing with `bt4`. Levels 7 and up double the fast bytes.
    pub fn from_level(level: u32) -> Result<Self> {
        if level > LEVEL_MAX {
            return Err(OxiLzError::invalid_usage(format!(
                "compression level {level} exceeds {LEVEL_MAX}"
            )));
        }

        let dict_size = match level {
            0..=5 => 1 << (level * 2 + 14),
            6 | 7 => 1 << 25,
            _ => 1 << 26,
        };
        let fast = level < 5;

        Ok(Self {
            dict_size,
            algorithm: if fast { 0 } else { 1 },
            num_fast_bytes: if level < 7 { 32 } else { 64 },
            match_finder: (if fast { "hc4" } else { "bt4" }).to_string(),
            ..Self::default()
        })
    }

    /// The canonical property set for this configuration.
    ///
    /// Unset optional fields are left out so the engine keeps its defaults.
    pub fn to_property_set(&self) -> Result<PropertySet> {
        let mut set = PropertySet::new()
            .with(PropertyId::DictionarySize, self.dict_size)?
            .with(PropertyId::PosStateBits, self.pos_state_bits)?
            .with(PropertyId::LitContextBits, self.lit_context_bits)?
            .with(PropertyId::LitPosBits, self.lit_pos_bits)?
            .with(PropertyId::Algorithm, self.algorithm)?
            .with(PropertyId::NumFastBytes, self.num_fast_bytes)?
            .with(PropertyId::MatchFinder, self.match_finder.as_str())?
            .with(PropertyId::EndMarker, self.end_marker)?;

        if let Some(cycles) = self.match_finder_cycles {
            set.insert(PropertyId::MatchFinderCycles, cycles)?;
        }
        if let Some(threads) = self.num_threads {
            set.insert(PropertyId::NumThreads, threads)?;
        }
        Ok(set)
    }

    /// Run the engine's range checks without touching any stream.
    pub fn validate(&self) -> Result<()> {
        EncoderSettings::default().apply(&self.to_property_set()?)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OxiLzError::config(format!("invalid codec configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OxiLzError::config(format!("cannot serialize configuration: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_property_set() {
        let config = CodecConfig::default();
        let set = config.to_property_set().unwrap();
        assert_eq!(set.len(), 8);
        assert_eq!(
            set.get(PropertyId::DictionarySize).and_then(|v| v.as_u32()),
            Some(1 << 16)
        );
        assert_eq!(
            set.get(PropertyId::MatchFinder).and_then(|v| v.as_symbol()),
            Some("bt4")
        );
        assert!(!set.contains(PropertyId::NumThreads));
        config.validate().unwrap();
    }

    #[test]
    fn test_optional_fields() {
        let config = CodecConfig {
            match_finder_cycles: Some(4),
            num_threads: Some(2),
            ..CodecConfig::default()
        };
        let set = config.to_property_set().unwrap();
        assert_eq!(set.len(), 10);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = CodecConfig {
            pos_state_bits: 5,
            ..CodecConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            OxiLzError::InvalidParameter {
                property: Some(PropertyId::PosStateBits),
                ..
            }
        ));

        let config = CodecConfig {
            match_finder: "bt9".to_string(),
            ..CodecConfig::default()
        };
        assert!(config.validate().unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_levels() {
        for level in 0..=LEVEL_MAX {
            CodecConfig::from_level(level).unwrap().validate().unwrap();
        }
        let fastest = CodecConfig::from_level(0).unwrap();
        assert_eq!(fastest.dict_size, 1 << 14);
        assert_eq!(fastest.match_finder, "hc4");
        assert_eq!(fastest.algorithm, 0);

        let best = CodecConfig::from_level(9).unwrap();
        assert_eq!(best.dict_size, 1 << 26);
        assert_eq!(best.num_fast_bytes, 64);
        assert_eq!(best.algorithm, 1);

        assert!(CodecConfig::from_level(10).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = CodecConfig {
            dict_size: 1 << 20,
            end_marker: true,
            num_threads: Some(1),
            ..CodecConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(CodecConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_partial_and_invalid() {
        let config = CodecConfig::from_json(r#"{ "dict_size": 1048576 }"#).unwrap();
        assert_eq!(config.dict_size, 1 << 20);
        assert_eq!(config.match_finder, "bt4");

        let err = CodecConfig::from_json(r#"{ "dict_size": "big" }"#).unwrap_err();
        assert!(matches!(err, OxiLzError::Config { .. }));

        let err = CodecConfig::from_json(r#"{ "dictionary": 1 }"#).unwrap_err();
        assert!(matches!(err, OxiLzError::Config { .. }));

        let err = CodecConfig::from_json(r#"{ "lit_context_bits": 9 }"#).unwrap_err();
        assert!(err.is_invalid_parameter());
    }
}
