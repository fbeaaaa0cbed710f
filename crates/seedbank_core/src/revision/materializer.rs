//! Projection rebuild from canonical state.
//!
//! # Responsibility
//! - Decode the canonical document and rewrite every projection row for it.
//!
//! # Invariants
//! - Runs on the caller's connection or transaction; it never opens its own.
//! - Rows are always rebuilt in full, never patched.

use crate::crdt::{read_record, CrdtDocument, RecordDecodeError};
use crate::model::projection::VegetableProjection;
use crate::model::revision::DocumentId;
use crate::model::vegetable::VegetableData;
use crate::repo::projection_repo::{ProjectionRepository, SqliteProjectionRepository};
use crate::repo::RepoError;
use log::debug;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub enum MaterializeError {
    Decode(RecordDecodeError),
    Repo(RepoError),
}

impl Display for MaterializeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MaterializeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RecordDecodeError> for MaterializeError {
    fn from(value: RecordDecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<RepoError> for MaterializeError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Rewrites the projection of `document_id` from `document`.
///
/// Returns the rows that were written.
pub fn materialize<D: CrdtDocument>(
    conn: &Connection,
    document_id: DocumentId,
    document: &D,
    materialized_at: i64,
) -> Result<VegetableProjection, MaterializeError> {
    let started_at = Instant::now();
    let data: VegetableData = read_record(document)?;
    let projection = VegetableProjection::derive(document_id, &data);

    let repo = SqliteProjectionRepository::try_new(conn)?;
    repo.replace_projection(&projection, &document.causal_position(), materialized_at)?;

    debug!(
        "event=materialize module=revision status=ok document_id={} translations={} duration_ms={}",
        document_id,
        projection.translations.len(),
        started_at.elapsed().as_millis()
    );
    Ok(projection)
}
