//! CRDT capability consumed by the revision workflow.
//!
//! # Responsibility
//! - Define the narrow document contract the workflow relies on.
//! - Keep the concrete engine (`loro`) behind one adapter type.
//! - Convert between canonical documents and typed records.
//!
//! # Invariants
//! - Documents are explicitly owned values; nothing here shares a mutable
//!   document across operations.
//! - Engine errors never escape as panics; they surface as `CrdtError`.

use crate::model::revision::CausalPosition;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod codec;
mod loro_engine;

pub use codec::{read_record, update_record, write_record, MirroredRecord, RecordDecodeError};
pub use loro_engine::LoroDocument;

pub type CrdtResult<T> = Result<T, CrdtError>;

/// Failure raised by the CRDT engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrdtError {
    /// Bytes could not be imported (malformed or unsupported encoding).
    Import(String),
    Export(String),
    /// Computing or applying a structural diff failed.
    Diff(String),
    /// A container operation failed while editing.
    Edit(String),
    /// Document state could not be turned into plain data.
    Decode(String),
    /// A record could not be written into document containers.
    Encode(String),
}

impl Display for CrdtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Import(message) => write!(f, "crdt import failed: {message}"),
            Self::Export(message) => write!(f, "crdt export failed: {message}"),
            Self::Diff(message) => write!(f, "crdt diff failed: {message}"),
            Self::Edit(message) => write!(f, "crdt edit failed: {message}"),
            Self::Decode(message) => write!(f, "crdt decode failed: {message}"),
            Self::Encode(message) => write!(f, "crdt encode failed: {message}"),
        }
    }
}

impl Error for CrdtError {}

impl From<loro::LoroError> for CrdtError {
    fn from(value: loro::LoroError) -> Self {
        Self::Edit(value.to_string())
    }
}

/// Result of importing foreign update bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportOutcome {
    /// Some operations reference history this document does not know and
    /// were parked instead of applied.
    pub pending_dependencies: bool,
}

/// Causal structured document used as canonical state.
///
/// Implementations must treat `fork` as a deep, independent copy that shares
/// causal history with its source.
pub trait CrdtDocument: Sized {
    /// Compact marker of the latest known operations.
    type Frontier: Clone;
    /// Full per-peer operation counts.
    type Version: Clone + Default;
    /// Structural difference between two frontiers.
    type Delta;

    /// Hydrates a document from a full snapshot.
    fn from_snapshot(bytes: &[u8]) -> CrdtResult<Self>;

    fn fork(&self) -> Self;

    /// Net state change between two frontiers of this document.
    fn diff(&self, from: &Self::Frontier, to: &Self::Frontier) -> CrdtResult<Self::Delta>;

    /// Applies a delta as new local operations.
    fn apply_diff(&self, delta: Self::Delta) -> CrdtResult<()>;

    /// Imports update or snapshot bytes.
    fn import(&self, bytes: &[u8]) -> CrdtResult<ImportOutcome>;

    fn export_snapshot(&self) -> CrdtResult<Vec<u8>>;

    /// Exports every operation not covered by `from`.
    fn export_updates(&self, from: &Self::Version) -> CrdtResult<Vec<u8>>;

    fn version(&self) -> Self::Version;

    fn frontiers(&self) -> Self::Frontier;

    /// Persistable form of the current frontier.
    fn causal_position(&self) -> CausalPosition;

    /// Closes any open implicit transaction without metadata.
    fn commit_pending(&self);

    /// Commits pending operations with a message and a unix timestamp in seconds.
    fn commit(&self, message: &str, timestamp: i64);

    /// Message attached to the causally latest change at the current frontier, if any.
    fn last_commit_message(&self) -> Option<String>;

    /// Plain-data form of the whole document.
    fn to_json(&self) -> CrdtResult<serde_json::Value>;
}
