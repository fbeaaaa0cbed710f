//! Canonical document and revision records.
//!
//! # Responsibility
//! - Define identities for documents, revisions and people.
//! - Define the revision evaluation state machine.
//! - Define the persisted causal position shape.
//!
//! # Invariants
//! - `Pending` is the only non-terminal evaluation.
//! - A revision's `update` bytes are opaque; only the CRDT layer interprets them.
//! - `CausalPosition` is for indexing/debugging only, never for merge logic.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one canonical document (and its projection rows).
pub type DocumentId = Uuid;
/// Stable identifier of one proposed revision.
pub type RevisionId = Uuid;
/// Stable identifier of an author or evaluator.
pub type PersonId = Uuid;

/// Review state of a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Evaluation {
    /// Awaiting a decision. Initial state.
    Pending,
    /// Merged into the canonical document. Terminal.
    Approved,
    /// Discarded without touching canonical state. Terminal.
    Rejected,
}

impl Evaluation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One `{peer, counter}` entry of a causal frontier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrontierEntry {
    /// Peer id rendered in decimal; 64-bit ids do not fit every JSON reader.
    pub peer: String,
    pub counter: i64,
}

/// Compact marker of everything causally known at one point in history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CausalPosition(pub Vec<FrontierEntry>);

impl CausalPosition {
    /// Builds a position from raw peer/counter pairs, sorted for stable output.
    pub fn from_entries(entries: impl IntoIterator<Item = (u64, i64)>) -> Self {
        let mut entries: Vec<FrontierEntry> = entries
            .into_iter()
            .map(|(peer, counter)| FrontierEntry {
                peer: peer.to_string(),
                counter,
            })
            .collect();
        entries.sort();
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON array form persisted next to snapshots and revisions.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn from_json_str(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}

/// Canonical state row of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    /// Full CRDT snapshot. Only the merge path rewrites it.
    pub canonical_snapshot: Vec<u8>,
    pub current_frontier: CausalPosition,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// A proposed change to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: RevisionId,
    pub document_id: DocumentId,
    pub author_id: PersonId,
    /// Clean CRDT update relative to `base_version`.
    pub update: Vec<u8>,
    /// Canonical position the update was validated against at creation.
    pub base_version: CausalPosition,
    pub evaluation: Evaluation,
    pub evaluator_id: Option<PersonId>,
    pub evaluation_comment: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds. Set together with `evaluator_id`.
    pub evaluated_at: Option<i64>,
}

impl Revision {
    /// Creates a new pending revision with a time-ordered id.
    pub fn pending(
        document_id: DocumentId,
        author_id: PersonId,
        update: Vec<u8>,
        base_version: CausalPosition,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            document_id,
            author_id,
            update,
            base_version,
            evaluation: Evaluation::Pending,
            evaluator_id: None,
            evaluation_comment: None,
            created_at,
            evaluated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CausalPosition, Evaluation};

    #[test]
    fn evaluation_text_round_trip() {
        for evaluation in [
            Evaluation::Pending,
            Evaluation::Approved,
            Evaluation::Rejected,
        ] {
            assert_eq!(Evaluation::parse(evaluation.as_str()), Some(evaluation));
        }
        assert!(!Evaluation::Pending.is_terminal());
        assert!(Evaluation::Rejected.is_terminal());
    }

    #[test]
    fn causal_position_serializes_as_sorted_array() {
        let position = CausalPosition::from_entries([(u64::MAX, 3), (7, 0)]);
        let json = position.to_json_string();
        assert_eq!(
            json,
            r#"[{"peer":"18446744073709551615","counter":3},{"peer":"7","counter":0}]"#
        );
        assert_eq!(CausalPosition::from_json_str(&json).unwrap(), position);
    }
}
