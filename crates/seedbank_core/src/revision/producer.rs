//! Clean-diff edit producer.
//!
//! # Responsibility
//! - Turn an arbitrary editing session into one update carrying only its net
//!   effect against the source document.
//!
//! # Invariants
//! - The exported update is rebuilt from a structural diff on a fresh fork, so
//!   transient edits (typo then fix, paste then delete) are absent from it.
//! - The update's single change carries a `human-action` commit message.
//! - An editing session with no net effect yields a valid, empty update.

use crate::crdt::{CrdtDocument, CrdtError};
use crate::model::commit::CommitMessage;
use crate::model::revision::PersonId;
use log::debug;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Output of one editing session.
#[derive(Debug)]
pub struct CleanUpdate<D> {
    /// Source state plus the net edit, committed with author provenance.
    pub final_document: D,
    /// Causal delta from the source version to `final_document`.
    pub update: Vec<u8>,
}

/// Runs `edit` on a scratch fork of `source` and returns a clean update.
///
/// The commit timestamp is the current unix time in seconds.
pub fn produce_clean_update<D, F, E>(
    source: &D,
    edit: F,
    author_id: PersonId,
) -> Result<CleanUpdate<D>, E>
where
    D: CrdtDocument,
    F: FnOnce(&D) -> Result<(), E>,
    E: From<CrdtError>,
{
    produce_clean_update_at(source, edit, author_id, now_epoch_secs())
}

/// Same as [`produce_clean_update`] with an explicit commit timestamp.
pub fn produce_clean_update_at<D, F, E>(
    source: &D,
    edit: F,
    author_id: PersonId,
    timestamp: i64,
) -> Result<CleanUpdate<D>, E>
where
    D: CrdtDocument,
    F: FnOnce(&D) -> Result<(), E>,
    E: From<CrdtError>,
{
    let started_at = Instant::now();

    let scratch = source.fork();
    edit(&scratch)?;
    scratch.commit_pending();

    let delta = scratch.diff(&source.frontiers(), &scratch.frontiers())?;
    drop(scratch);

    let final_document = source.fork();
    final_document.apply_diff(delta)?;
    let message = CommitMessage::HumanAction {
        person_id: author_id,
    }
    .encode()
    .map_err(|err| CrdtError::Encode(err.to_string()))?;
    final_document.commit(&message, timestamp);

    let update = final_document.export_updates(&source.version())?;
    debug!(
        "event=clean_update module=revision status=ok update_bytes={} duration_ms={}",
        update.len(),
        started_at.elapsed().as_millis()
    );

    Ok(CleanUpdate {
        final_document,
        update,
    })
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
