//!
//! Self-describing dynamic values used for structural validation of
//! metadata and extension fields.
//!
//! A `CandyValue` is a finitely recursive tagged tree: a handful of leaf
//! variants plus ordered composites. It is deliberately separate from a
//! method's strongly-typed argument: endpoints keep their candid types and
//! reach for candy only where the static shape is too rigid.
//!

pub mod pattern;
pub mod validate;

pub use pattern::PatternKind;
pub use validate::{CandyCheck, CandyError, PathStep, ValidationLimits};

use crate::types::{ByteBuf, Int, Nat};
use candid::CandidType;
use derive_more::Display;
use serde::{Deserialize, Serialize};

// Byte costs used by the size estimator. Leaves carry fixed costs,
// composites pay a per-entry overhead on top of their children.
pub const COST_UNIT: u64 = 1;
pub const COST_NUMERIC: u64 = 8;
pub const COST_PER_CHAR: u64 = 4;
pub const COST_PER_ENTRY: u64 = 4;

///
/// CandyValue
///
/// Composite variants preserve insertion order. `Map` key uniqueness is not
/// enforced at the type level; `map_key_exists` checks the first match.
///

#[derive(CandidType, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CandyValue {
    Array(Vec<CandyValue>),
    Blob(ByteBuf),
    Bool(bool),
    Class(Vec<CandyProperty>),
    Float(f64),
    Int(Int),
    Map(Vec<(String, CandyValue)>),
    Nat(Nat),
    Null,
    Opt(Option<Box<CandyValue>>),
    Text(String),
    ValueMap(Vec<(CandyValue, CandyValue)>),
}

///
/// CandyProperty
/// `immutable` is advisory metadata and is not enforced here.
///

#[derive(CandidType, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandyProperty {
    pub name: String,
    pub value: CandyValue,
    pub immutable: bool,
}

impl CandyProperty {
    #[must_use]
    pub fn new(name: impl Into<String>, value: CandyValue) -> Self {
        Self {
            name: name.into(),
            value,
            immutable: false,
        }
    }
}

///
/// CandyTag
/// The outermost type tag of a `CandyValue`, used for type checks.
///

#[derive(
    CandidType, Clone, Copy, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[remain::sorted]
pub enum CandyTag {
    #[display("array")]
    Array,
    #[display("blob")]
    Blob,
    #[display("bool")]
    Bool,
    #[display("class")]
    Class,
    #[display("float")]
    Float,
    #[display("int")]
    Int,
    #[display("map")]
    Map,
    #[display("nat")]
    Nat,
    #[display("null")]
    Null,
    #[display("opt")]
    Opt,
    #[display("text")]
    Text,
    #[display("value_map")]
    ValueMap,
}

impl CandyTag {
    /// Whether values of this tag can be compared against numeric bounds.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Float | Self::Int | Self::Nat)
    }
}

impl CandyValue {
    #[must_use]
    pub const fn tag(&self) -> CandyTag {
        match self {
            Self::Array(_) => CandyTag::Array,
            Self::Blob(_) => CandyTag::Blob,
            Self::Bool(_) => CandyTag::Bool,
            Self::Class(_) => CandyTag::Class,
            Self::Float(_) => CandyTag::Float,
            Self::Int(_) => CandyTag::Int,
            Self::Map(_) => CandyTag::Map,
            Self::Nat(_) => CandyTag::Nat,
            Self::Null => CandyTag::Null,
            Self::Opt(_) => CandyTag::Opt,
            Self::Text(_) => CandyTag::Text,
            Self::ValueMap(_) => CandyTag::ValueMap,
        }
    }

    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(
            self,
            Self::Array(_) | Self::Class(_) | Self::Map(_) | Self::Opt(_) | Self::ValueMap(_)
        )
    }

    /// Depth of the value tree. Leaves are depth 0; entering any composite
    /// adds one level. Unbounded recursion is impossible on owned trees, but
    /// prefer the capped walk in [`validate`] for untrusted input.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Array(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            Self::Class(props) => 1 + props.iter().map(|p| p.value.depth()).max().unwrap_or(0),
            Self::Map(entries) => 1 + entries.iter().map(|(_, v)| v.depth()).max().unwrap_or(0),
            Self::ValueMap(entries) => {
                1 + entries
                    .iter()
                    .map(|(k, v)| k.depth().max(v.depth()))
                    .max()
                    .unwrap_or(0)
            }
            Self::Opt(inner) => 1 + inner.as_ref().map_or(0, |v| v.depth()),
            _ => 0,
        }
    }

    /// Estimated byte footprint of the value tree.
    ///
    /// Fixed leaf costs (bool/null = 1, numerics = 8), 4 bytes per text
    /// character, blob byte length, and a per-entry overhead for composites
    /// (maps additionally pay for their keys). The estimate is a DoS metric,
    /// not an encoding size.
    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        match self {
            Self::Bool(_) | Self::Null => COST_UNIT,
            Self::Float(_) | Self::Int(_) | Self::Nat(_) => COST_NUMERIC,
            Self::Text(s) => COST_PER_CHAR * s.chars().count() as u64,
            Self::Blob(b) => b.len() as u64,
            Self::Opt(inner) => COST_UNIT + inner.as_ref().map_or(0, |v| v.estimated_size()),
            Self::Array(items) => items
                .iter()
                .map(|v| COST_PER_ENTRY + v.estimated_size())
                .sum(),
            Self::Map(entries) => entries
                .iter()
                .map(|(k, v)| {
                    COST_PER_ENTRY + COST_PER_CHAR * k.chars().count() as u64 + v.estimated_size()
                })
                .sum(),
            Self::ValueMap(entries) => entries
                .iter()
                .map(|(k, v)| COST_PER_ENTRY + k.estimated_size() + v.estimated_size())
                .sum(),
            Self::Class(props) => props
                .iter()
                .map(|p| {
                    COST_PER_ENTRY
                        + COST_PER_CHAR * p.name.chars().count() as u64
                        + COST_UNIT
                        + p.value.estimated_size()
                })
                .sum(),
        }
    }

    /// Look up a class property by name (first match).
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&CandyProperty> {
        match self {
            Self::Class(props) => props.iter().find(|p| p.name == name),
            _ => None,
        }
    }

    /// Look up a map entry by text key (first match).
    #[must_use]
    pub fn map_get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    #[must_use]
    pub fn map_key_exists(&self, key: &str) -> bool {
        self.map_get(key).is_some()
    }

    /// Look up a value-map entry by candy key (structural equality).
    #[must_use]
    pub fn value_map_get(&self, key: &Self) -> Option<&Self> {
        match self {
            Self::ValueMap(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Bounded description of the value for error messages: type plus length
    /// where one exists, never content.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Text(s) => format!("text({} chars)", s.chars().count()),
            Self::Blob(b) => format!("blob({} bytes)", b.len()),
            Self::Array(items) => format!("array({})", items.len()),
            Self::Map(entries) => format!("map({})", entries.len()),
            Self::ValueMap(entries) => format!("value_map({})", entries.len()),
            Self::Class(props) => format!("class({})", props.len()),
            other => other.tag().to_string(),
        }
    }
}

//
// leaf conversions, mostly for tests and rule construction
//

impl From<&str> for CandyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CandyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for CandyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u64> for CandyValue {
    fn from(n: u64) -> Self {
        Self::Nat(Nat::from(n))
    }
}

impl From<i64> for CandyValue {
    fn from(n: i64) -> Self {
        Self::Int(Int::from(n))
    }
}

impl From<Vec<u8>> for CandyValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Blob(ByteBuf::from(bytes))
    }
}

///
/// TESTS
///
