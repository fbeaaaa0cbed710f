//! Domain model for collaboratively edited entries and their revisions.
//!
//! # Responsibility
//! - Define the typed record stored inside canonical CRDT documents.
//! - Define revision metadata and the evaluation state machine.
//! - Define the flat projection rows derived from canonical documents.
//!
//! # Invariants
//! - Every document and revision is identified by a stable UUID.
//! - A revision evaluation only moves `Pending -> Approved | Rejected`.
//! - Projection rows are derived data; canonical state lives in the CRDT.

pub mod commit;
pub mod projection;
pub mod record;
pub mod revision;
pub mod vegetable;
