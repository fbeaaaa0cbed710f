//! Error taxonomy of the revision workflow.

use crate::crdt::{CrdtError, RecordDecodeError};
use crate::model::revision::{DocumentId, Evaluation, RevisionId};
use crate::repo::RepoError;
use crate::revision::materializer::MaterializeError;
use crate::revision::validator::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RevisionResult<T> = Result<T, RevisionError>;

/// Typed failure returned by revision use-cases.
///
/// Validation and state-machine variants are permanent and never retried
/// internally. `Crdt` and `Repo` wrap infrastructure failures.
#[derive(Debug)]
pub enum RevisionError {
    DocumentNotFound(DocumentId),
    RevisionNotFound(RevisionId),
    /// Update bytes do not decode as a CRDT update.
    InvalidFormat(String),
    /// Resulting document violates the record schema.
    SchemaValidationFailed(String),
    /// Revision already left `Pending`.
    AlreadyEvaluated {
        revision_id: RevisionId,
        evaluation: Evaluation,
    },
    /// `Pending` is not a valid evaluation target.
    InvalidEvaluation,
    /// Update was built against a different document lineage.
    OriginMismatch,
    Crdt(CrdtError),
    Repo(RepoError),
}

impl Display for RevisionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::RevisionNotFound(id) => write!(f, "revision not found: {id}"),
            Self::InvalidFormat(message) => write!(f, "invalid update format: {message}"),
            Self::SchemaValidationFailed(message) => {
                write!(f, "schema validation failed: {message}")
            }
            Self::AlreadyEvaluated {
                revision_id,
                evaluation,
            } => write!(
                f,
                "revision {revision_id} already evaluated as {}",
                evaluation.as_str()
            ),
            Self::InvalidEvaluation => write!(f, "evaluation must be approved or rejected"),
            Self::OriginMismatch => write!(f, "update does not descend from this document"),
            Self::Crdt(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RevisionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Crdt(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CrdtError> for RevisionError {
    fn from(value: CrdtError) -> Self {
        Self::Crdt(value)
    }
}

impl From<RepoError> for RevisionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for RevisionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

impl From<RecordDecodeError> for RevisionError {
    fn from(value: RecordDecodeError) -> Self {
        match value {
            RecordDecodeError::Crdt(err) => Self::Crdt(err),
            RecordDecodeError::Shape(message) => Self::SchemaValidationFailed(message),
            RecordDecodeError::Invalid(err) => Self::SchemaValidationFailed(err.to_string()),
        }
    }
}

impl From<ValidationError> for RevisionError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::InvalidFormat(message) => Self::InvalidFormat(message),
            ValidationError::SchemaValidationFailed(message) => {
                Self::SchemaValidationFailed(message)
            }
            ValidationError::OriginMismatch => Self::OriginMismatch,
            ValidationError::Crdt(err) => Self::Crdt(err),
        }
    }
}

impl From<MaterializeError> for RevisionError {
    fn from(value: MaterializeError) -> Self {
        match value {
            MaterializeError::Decode(err) => err.into(),
            MaterializeError::Repo(err) => Self::Repo(err),
        }
    }
}
