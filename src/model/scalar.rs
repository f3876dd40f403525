//! Scalar leaf values carried at the bottom of a `Tree`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive scalar kinds a signal can be cast into and built back from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "NULL",
            Scalar::Bool(_) => "BOOLEAN",
            Scalar::Int(_) => "INTEGER",
            Scalar::Float(_) => "FLOAT",
            Scalar::String(_) => "STRING",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Scalar::Null) }

    /// Truthiness used by boolean casts: null and zero are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i != 0,
            Scalar::Float(f) => *f != 0.0,
            Scalar::String(s) => !s.is_empty(),
        }
    }

    /// Attempt to extract as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Scalar::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::Float(f) => Some(*f),
            Scalar::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// Lossy scalar casts
// ============================================================================

/// Lossy conversion out of a `Scalar`, used by `Signal::cast_or`.
///
/// Returns `None` when the scalar has no sensible reading as `Self`.
pub trait FromScalar: Sized {
    fn from_scalar(scalar: &Scalar) -> Option<Self>;
}

impl FromScalar for bool {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Null => None,
            other => Some(other.is_truthy()),
        }
    }
}

impl FromScalar for i64 {
    fn from_scalar(scalar: &Scalar) -> Option<Self> { scalar.as_int() }
}

impl FromScalar for f64 {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => other.as_float(),
        }
    }
}

impl FromScalar for String {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Null => None,
            Scalar::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl FromScalar for Scalar {
    fn from_scalar(scalar: &Scalar) -> Option<Self> { Some(scalar.clone()) }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Scalar { fn from(v: bool) -> Self { Scalar::Bool(v) } }
impl From<i32> for Scalar { fn from(v: i32) -> Self { Scalar::Int(v as i64) } }
impl From<i64> for Scalar { fn from(v: i64) -> Self { Scalar::Int(v) } }
impl From<f64> for Scalar { fn from(v: f64) -> Self { Scalar::Float(v) } }
impl From<String> for Scalar { fn from(v: String) -> Self { Scalar::String(v) } }
impl From<&str> for Scalar { fn from(v: &str) -> Self { Scalar::String(v.to_owned()) } }

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(s) => write!(f, "{s}"),
        }
    }
}
