//! Coder property model.
//!
//! Callers describe an engine configuration as a [`PropertySet`]: an ordered
//! list of ([`PropertyId`], [`PropertyValue`]) pairs. Every identifier accepts
//! exactly one [`ValueKind`], and the kind is checked when a pair enters the
//! set, so an engine never sees a mistyped value. Numeric ranges are engine
//! specific and are checked by the engine when the set is applied.

use crate::error::{OxiLzError, Result};
use std::fmt;

/// Identifier of a configurable coder property.
///
/// Ordinals are stable and match the classic LZMA SDK numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PropertyId {
    /// Default property.
    DefaultProp = 0,
    /// Dictionary size in bytes.
    DictionarySize = 1,
    /// Memory size for PPM methods.
    UsedMemorySize = 2,
    /// Model order for PPM methods.
    Order = 3,
    /// Block size.
    BlockSize = 4,
    /// Number of position state bits (LZMA: 0..=4).
    PosStateBits = 5,
    /// Number of literal context bits (LZMA: 0..=8).
    LitContextBits = 6,
    /// Number of literal position bits (LZMA: 0..=4).
    LitPosBits = 7,
    /// Number of fast bytes (LZMA: 5..=273).
    NumFastBytes = 8,
    /// Match finder name (LZMA: "bt2", "bt3", "bt4" or "hc4").
    MatchFinder = 9,
    /// Number of match finder cycles.
    MatchFinderCycles = 10,
    /// Number of passes.
    NumPasses = 11,
    /// Algorithm mode (LZMA: 0 = fast, 1 = normal).
    Algorithm = 12,
    /// Number of worker threads.
    NumThreads = 13,
    /// Whether an end-of-stream marker is written.
    EndMarker = 14,
}

impl PropertyId {
    /// Every identifier, in ordinal order.
    pub const ALL: [Self; 15] = [
        Self::DefaultProp,
        Self::DictionarySize,
        Self::UsedMemorySize,
        Self::Order,
        Self::BlockSize,
        Self::PosStateBits,
        Self::LitContextBits,
        Self::LitPosBits,
        Self::NumFastBytes,
        Self::MatchFinder,
        Self::MatchFinderCycles,
        Self::NumPasses,
        Self::Algorithm,
        Self::NumThreads,
        Self::EndMarker,
    ];

    /// Stable ordinal of this identifier.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Look up an identifier by ordinal.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// The single value kind this identifier accepts.
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::MatchFinder => ValueKind::Symbol,
            Self::EndMarker => ValueKind::Bool,
            _ => ValueKind::UInt,
        }
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::DefaultProp => "DefaultProp",
            Self::DictionarySize => "DictionarySize",
            Self::UsedMemorySize => "UsedMemorySize",
            Self::Order => "Order",
            Self::BlockSize => "BlockSize",
            Self::PosStateBits => "PosStateBits",
            Self::LitContextBits => "LitContextBits",
            Self::LitPosBits => "LitPosBits",
            Self::NumFastBytes => "NumFastBytes",
            Self::MatchFinder => "MatchFinder",
            Self::MatchFinderCycles => "MatchFinderCycles",
            Self::NumPasses => "NumPasses",
            Self::Algorithm => "Algorithm",
            Self::NumThreads => "NumThreads",
            Self::EndMarker => "EndMarker",
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type tag of a [`PropertyValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Unsigned integer.
    UInt,
    /// Boolean flag.
    Bool,
    /// Short symbolic string, such as a match finder name.
    Symbol,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UInt => "unsigned integer",
            Self::Bool => "boolean",
            Self::Symbol => "symbol",
        };
        f.write_str(name)
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Unsigned integer value.
    UInt(u32),
    /// Boolean value.
    Bool(bool),
    /// Symbolic value.
    Symbol(String),
}

impl PropertyValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::UInt(_) => ValueKind::UInt,
            Self::Bool(_) => ValueKind::Bool,
            Self::Symbol(_) => ValueKind::Symbol,
        }
    }

    /// Integer payload, if this is an integer.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Symbol payload, if this is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(v) => Some(v),
            _ => None,
        }
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::UInt(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Symbol(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Symbol(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Symbol(v) => write!(f, "{v:?}"),
        }
    }
}

/// An ordered, duplicate-free set of typed property assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    entries: Vec<(PropertyId, PropertyValue)>,
}

impl PropertySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from parallel identifier and value sequences.
    ///
    /// Fails if the lengths differ, if a value has the wrong kind for its
    /// identifier, or if an identifier repeats.
    pub fn from_pairs(ids: &[PropertyId], values: Vec<PropertyValue>) -> Result<Self> {
        if ids.len() != values.len() {
            return Err(OxiLzError::invalid_usage(format!(
                "{} property identifiers but {} values",
                ids.len(),
                values.len()
            )));
        }

        let mut set = Self::new();
        for (&id, value) in ids.iter().zip(values) {
            set.insert(id, value)?;
        }
        Ok(set)
    }

    /// Add one assignment.
    pub fn insert(&mut self, id: PropertyId, value: impl Into<PropertyValue>) -> Result<()> {
        let value = value.into();
        let expected = id.value_kind();

        if value.kind() != expected {
            return Err(OxiLzError::invalid_parameter(
                id,
                format!("expected {expected}, got {} {value}", value.kind()),
            ));
        }
        if self.contains(id) {
            return Err(OxiLzError::invalid_parameter(id, "assigned more than once"));
        }

        self.entries.push((id, value));
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, id: PropertyId, value: impl Into<PropertyValue>) -> Result<Self> {
        self.insert(id, value)?;
        Ok(self)
    }

    /// Value assigned to `id`, if any.
    pub fn get(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, value)| value)
    }

    /// Whether `id` is assigned.
    pub fn contains(&self, id: PropertyId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over the assignments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyValue)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_are_stable() {
        for (i, id) in PropertyId::ALL.iter().enumerate() {
            assert_eq!(id.ordinal() as usize, i);
            assert_eq!(PropertyId::from_ordinal(i as u8), Some(*id));
        }
        assert_eq!(PropertyId::PosStateBits.ordinal(), 5);
        assert_eq!(PropertyId::EndMarker.ordinal(), 14);
        assert_eq!(PropertyId::from_ordinal(15), None);
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(PropertyId::MatchFinder.value_kind(), ValueKind::Symbol);
        assert_eq!(PropertyId::EndMarker.value_kind(), ValueKind::Bool);
        assert_eq!(PropertyId::DictionarySize.value_kind(), ValueKind::UInt);
        assert_eq!(PropertyId::NumThreads.value_kind(), ValueKind::UInt);
    }

    #[test]
    fn test_from_pairs() {
        let set = PropertySet::from_pairs(
            &[
                PropertyId::DictionarySize,
                PropertyId::MatchFinder,
                PropertyId::EndMarker,
            ],
            vec![1u32.into(), "bt4".into(), false.into()],
        )
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.get(PropertyId::DictionarySize).and_then(|v| v.as_u32()),
            Some(1)
        );
        assert_eq!(
            set.get(PropertyId::MatchFinder).and_then(|v| v.as_symbol()),
            Some("bt4")
        );
        let order: Vec<_> = set.iter().map(|(id, _)| id).collect();
        assert_eq!(
            order,
            vec![
                PropertyId::DictionarySize,
                PropertyId::MatchFinder,
                PropertyId::EndMarker
            ]
        );
    }

    #[test]
    fn test_length_mismatch() {
        let err = PropertySet::from_pairs(&[PropertyId::DictionarySize], vec![]).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let err = PropertySet::new()
            .with(PropertyId::PosStateBits, "two")
            .unwrap_err();
        assert!(matches!(
            err,
            OxiLzError::InvalidParameter {
                property: Some(PropertyId::PosStateBits),
                ..
            }
        ));

        assert!(PropertySet::new().with(PropertyId::EndMarker, 1u32).is_err());
        assert!(PropertySet::new().with(PropertyId::MatchFinder, true).is_err());
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut set = PropertySet::new();
        set.insert(PropertyId::LitContextBits, 3u32).unwrap();
        assert!(set.insert(PropertyId::LitContextBits, 4u32).is_err());
        assert_eq!(set.len(), 1);
    }
}
