//! Core domain logic for seedbank.
//!
//! Canonical encyclopedia entries live in CRDT documents. Changes arrive as
//! reviewable revisions; approved revisions are merged into canonical state
//! and re-projected into flat SQL tables in one transaction.

pub mod config;
pub mod crdt;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod revision;
pub mod service;

pub use config::{CoreConfig, OriginPolicy};
pub use crdt::{read_record, update_record, write_record, CrdtDocument, CrdtError, LoroDocument};
pub use logging::{
    default_log_level, init_logging, init_logging_from, logging_status, LoggingError, LoggingStatus,
};
pub use model::commit::CommitMessage;
pub use model::projection::{ProjectedTranslation, ProjectedVegetable};
pub use model::revision::{CausalPosition, DocumentId, Evaluation, PersonId, Revision, RevisionId};
pub use model::vegetable::{Locale, VegetableData};
pub use repo::{RepoError, RepoResult};
pub use revision::{
    produce_clean_update, validate_update, CleanUpdate, RevisionError, RevisionResult,
};
pub use service::revision_service::RevisionService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
