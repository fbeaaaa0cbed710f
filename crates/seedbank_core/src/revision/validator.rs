//! Untrusted update validation.
//!
//! # Responsibility
//! - Check that update bytes decode, descend from the source lineage (per
//!   policy), and leave the document schema-valid.
//!
//! # Invariants
//! - The source document is never mutated; all work happens on a fork.

use crate::config::OriginPolicy;
use crate::crdt::{read_record, CrdtDocument, CrdtError, RecordDecodeError};
use crate::model::record::Record;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Update that passed validation.
#[derive(Debug)]
pub struct ValidatedUpdate<D, R> {
    /// Fork of the source with the update imported.
    pub merged_document: D,
    pub decoded: R,
    /// Operations were parked because they reference unknown history; only
    /// possible under `OriginPolicy::Permissive`.
    pub detached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidFormat(String),
    SchemaValidationFailed(String),
    OriginMismatch,
    Crdt(CrdtError),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat(message) => write!(f, "invalid update format: {message}"),
            Self::SchemaValidationFailed(message) => {
                write!(f, "schema validation failed: {message}")
            }
            Self::OriginMismatch => write!(f, "update does not descend from this document"),
            Self::Crdt(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Crdt(err) => Some(err),
            _ => None,
        }
    }
}

/// Imports `update` into a fork of `source` and decodes the result as `R`.
pub fn validate_update<D, R>(
    update: &[u8],
    source: &D,
    policy: OriginPolicy,
) -> Result<ValidatedUpdate<D, R>, ValidationError>
where
    D: CrdtDocument,
    R: Record,
{
    let merged_document = source.fork();
    let outcome = match merged_document.import(update) {
        Ok(outcome) => outcome,
        Err(CrdtError::Import(message)) => return Err(ValidationError::InvalidFormat(message)),
        Err(err) => return Err(ValidationError::Crdt(err)),
    };

    if outcome.pending_dependencies {
        match policy {
            OriginPolicy::Strict => return Err(ValidationError::OriginMismatch),
            OriginPolicy::Permissive => warn!(
                "event=update_validate module=revision status=detached policy={} update_bytes={}",
                policy.as_str(),
                update.len()
            ),
        }
    }

    let decoded = read_record::<R, D>(&merged_document).map_err(|err| match err {
        RecordDecodeError::Crdt(err) => ValidationError::Crdt(err),
        RecordDecodeError::Shape(message) => ValidationError::SchemaValidationFailed(message),
        RecordDecodeError::Invalid(err) => ValidationError::SchemaValidationFailed(err.to_string()),
    })?;

    Ok(ValidatedUpdate {
        merged_document,
        decoded,
        detached: outcome.pending_dependencies,
    })
}
