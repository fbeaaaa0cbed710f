//! Typed record contract for CRDT-backed documents.
//!
//! # Responsibility
//! - Describe what a canonical document must decode into.
//! - Report schema violations with the offending field path.
//!
//! # Invariants
//! - A record is only trusted after both decoding and `validate()` succeed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A plain-data record decoded from a CRDT document.
///
/// Decoding is handled by serde; `validate` enforces the invariants serde
/// cannot express (non-empty lists, string formats, value ranges).
pub trait Record: DeserializeOwned + Serialize {
    fn validate(&self) -> Result<(), RecordValidationError>;
}

/// Schema violation found while validating a decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    /// Handle is too short or contains characters outside `[a-z0-9-]`.
    InvalidHandle(String),
    /// A list that must carry at least one item is empty.
    EmptyList(String),
    /// A name value is blank after trimming.
    BlankValue(String),
    /// A `*_min` value is greater than its `*_max` counterpart.
    InvertedRange(&'static str),
    /// A float field holds NaN or an infinity, which plain data cannot carry.
    NonFiniteNumber(&'static str),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHandle(handle) => write!(f, "invalid handle `{handle}`"),
            Self::EmptyList(path) => write!(f, "`{path}` must not be empty"),
            Self::BlankValue(path) => write!(f, "`{path}` must not be blank"),
            Self::InvertedRange(field) => {
                write!(f, "`{field}_min` must not be greater than `{field}_max`")
            }
            Self::NonFiniteNumber(field) => write!(f, "`{field}` must be a finite number"),
        }
    }
}

impl Error for RecordValidationError {}
