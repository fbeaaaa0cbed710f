//! Merge of approved updates into canonical state.
//!
//! Conflict resolution belongs to the CRDT engine; this module only hydrates,
//! imports and re-exports.

use crate::crdt::{CrdtDocument, CrdtResult};
use crate::model::revision::CausalPosition;

/// New canonical state after a merge.
#[derive(Debug)]
pub struct MergeOutcome<D> {
    pub document: D,
    pub snapshot: Vec<u8>,
    /// Frontier of `document`, to be persisted next to `snapshot`.
    pub frontier: CausalPosition,
}

/// Imports `update` into the document stored as `canonical_snapshot`.
pub fn merge<D: CrdtDocument>(
    canonical_snapshot: &[u8],
    update: &[u8],
) -> CrdtResult<MergeOutcome<D>> {
    let document = D::from_snapshot(canonical_snapshot)?;
    document.import(update)?;
    let snapshot = document.export_snapshot()?;
    let frontier = document.causal_position();
    Ok(MergeOutcome {
        document,
        snapshot,
        frontier,
    })
}
