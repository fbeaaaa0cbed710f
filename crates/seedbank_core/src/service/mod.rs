//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate CRDT components and repository calls into use-case APIs.
//! - Own transaction boundaries for multi-table writes.

pub mod revision_service;
