//! Revision workflow building blocks.
//!
//! # Responsibility
//! - Produce clean updates from editing sessions.
//! - Validate untrusted updates against canonical state.
//! - Merge approved updates and rebuild projections.
//!
//! # Invariants
//! - None of these components persists canonical state on its own; the
//!   revision service owns the transaction boundary.

pub mod error;
pub mod materializer;
pub mod merge;
pub mod producer;
pub mod validator;

pub use error::{RevisionError, RevisionResult};
pub use materializer::{materialize, MaterializeError};
pub use merge::{merge, MergeOutcome};
pub use producer::{produce_clean_update, produce_clean_update_at, CleanUpdate};
pub use validator::{validate_update, ValidatedUpdate, ValidationError};
