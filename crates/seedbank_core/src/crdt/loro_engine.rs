//! `loro` implementation of [`CrdtDocument`].

use super::{CrdtDocument, CrdtError, CrdtResult, ImportOutcome};
use crate::model::revision::CausalPosition;
use loro::event::DiffBatch;
use loro::{CommitOptions, ExportMode, Frontiers, LoroDoc, ToJson, VersionVector, ID};

/// Owned handle to one `loro` document.
pub struct LoroDocument {
    doc: LoroDoc,
}

impl LoroDocument {
    /// Creates an empty document with a fresh peer id.
    pub fn new() -> Self {
        Self { doc: LoroDoc::new() }
    }

    /// Underlying engine document, for container-level edits.
    pub fn inner(&self) -> &LoroDoc {
        &self.doc
    }
}

impl Default for LoroDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoroDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoroDocument")
            .field("peer", &self.doc.peer_id())
            .field("position", &self.causal_position())
            .finish()
    }
}

impl CrdtDocument for LoroDocument {
    type Frontier = Frontiers;
    type Version = VersionVector;
    type Delta = DiffBatch;

    fn from_snapshot(bytes: &[u8]) -> CrdtResult<Self> {
        let document = Self::new();
        document
            .doc
            .import(bytes)
            .map_err(|err| CrdtError::Import(err.to_string()))?;
        Ok(document)
    }

    fn fork(&self) -> Self {
        Self {
            doc: self.doc.fork(),
        }
    }

    fn diff(&self, from: &Frontiers, to: &Frontiers) -> CrdtResult<DiffBatch> {
        self.doc
            .diff(from, to)
            .map_err(|err| CrdtError::Diff(err.to_string()))
    }

    fn apply_diff(&self, delta: DiffBatch) -> CrdtResult<()> {
        self.doc
            .apply_diff(delta)
            .map_err(|err| CrdtError::Diff(err.to_string()))
    }

    fn import(&self, bytes: &[u8]) -> CrdtResult<ImportOutcome> {
        let status = self
            .doc
            .import(bytes)
            .map_err(|err| CrdtError::Import(err.to_string()))?;
        Ok(ImportOutcome {
            pending_dependencies: status.pending.is_some(),
        })
    }

    fn export_snapshot(&self) -> CrdtResult<Vec<u8>> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|err| CrdtError::Export(err.to_string()))
    }

    fn export_updates(&self, from: &VersionVector) -> CrdtResult<Vec<u8>> {
        self.doc
            .export(ExportMode::updates(from))
            .map_err(|err| CrdtError::Export(err.to_string()))
    }

    fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    fn frontiers(&self) -> Frontiers {
        self.doc.oplog_frontiers()
    }

    fn causal_position(&self) -> CausalPosition {
        CausalPosition::from_entries(
            self.doc
                .oplog_frontiers()
                .iter()
                .map(|id| (id.peer, i64::from(id.counter))),
        )
    }

    fn commit_pending(&self) {
        self.doc.commit();
    }

    fn commit(&self, message: &str, timestamp: i64) {
        self.doc.commit_with(
            CommitOptions::new()
                .commit_msg(message)
                .timestamp(timestamp),
        );
    }

    fn last_commit_message(&self) -> Option<String> {
        // Concurrent heads: highest lamport wins, then timestamp, then peer.
        let change = self
            .doc
            .oplog_frontiers()
            .iter()
            .filter_map(|id| self.doc.get_change(ID::new(id.peer, id.counter)))
            .max_by_key(|change| (change.lamport, change.timestamp, change.id.peer))?;
        change.message.as_deref().map(str::to_string)
    }

    fn to_json(&self) -> CrdtResult<serde_json::Value> {
        Ok(self.doc.get_deep_value().to_json_value())
    }
}

#[cfg(test)]
mod tests {
    use super::LoroDocument;
    use crate::crdt::CrdtDocument;
    use serde_json::json;

    #[test]
    fn fork_is_independent_of_source() {
        let source = LoroDocument::new();
        source
            .inner()
            .get_map("metadata")
            .insert("handle", "zea-mays")
            .unwrap();
        source.commit_pending();

        let fork = source.fork();
        fork.inner()
            .get_map("metadata")
            .insert("handle", "oryza-sativa")
            .unwrap();
        fork.commit_pending();

        assert_eq!(
            source.to_json().unwrap(),
            json!({ "metadata": { "handle": "zea-mays" } })
        );
        assert_eq!(
            fork.to_json().unwrap(),
            json!({ "metadata": { "handle": "oryza-sativa" } })
        );
    }

    #[test]
    fn commit_message_is_readable_from_head() {
        let doc = LoroDocument::new();
        doc.inner().get_map("metadata").insert("height_max", 400).unwrap();
        doc.commit("hello", 1_700_000_000);
        assert_eq!(doc.last_commit_message().as_deref(), Some("hello"));
        assert!(!doc.causal_position().is_empty());
    }

    #[test]
    fn commit_message_follows_causally_latest_head() {
        let doc = LoroDocument::new();
        doc.inner().set_peer_id(1).unwrap();
        let metadata = doc.inner().get_map("metadata");
        metadata.insert("handle", "zea-mays").unwrap();
        doc.commit("base", 1_700_000_000);

        let side = doc.fork();
        side.inner().set_peer_id(1 << 48).unwrap();
        side.inner().get_map("metadata").insert("height_min", 20).unwrap();
        side.commit("side", 1_700_000_010);

        metadata.insert("height_max", 400).unwrap();
        doc.commit("first", 1_700_000_001);
        metadata.insert("height_max", 420).unwrap();
        doc.commit("second", 1_700_000_002);

        doc.import(&side.export_updates(&doc.version()).unwrap()).unwrap();
        assert_eq!(doc.frontiers().len(), 2);
        assert_eq!(doc.last_commit_message().as_deref(), Some("second"));
    }

    #[test]
    fn snapshot_round_trip_preserves_state() {
        let doc = LoroDocument::new();
        doc.inner().get_map("metadata").insert("height_max", 400).unwrap();
        doc.commit_pending();

        let restored = LoroDocument::from_snapshot(&doc.export_snapshot().unwrap()).unwrap();
        assert_eq!(restored.to_json().unwrap(), doc.to_json().unwrap());
        assert_eq!(restored.causal_position(), doc.causal_position());
    }

    #[test]
    fn garbage_bytes_fail_to_import() {
        let doc = LoroDocument::new();
        assert!(doc.import(&[1, 2, 3, 4, 5]).is_err());
    }
}
