//! Revision workflow use-case service.
//!
//! # Responsibility
//! - Create canonical documents and proposed revisions.
//! - Drive the `pending -> approved | rejected` state machine.
//! - Keep canonical state and projections consistent on approval.
//!
//! # Invariants
//! - Approval is the only path that rewrites a canonical snapshot.
//! - Approval validates, merges, materializes and marks the revision inside
//!   one IMMEDIATE transaction; any failure rolls all of it back and the
//!   revision stays `pending`.
//! - IMMEDIATE transactions take the database write lock up front, so two
//!   approvals of the same document never merge against the same base.

use crate::config::OriginPolicy;
use crate::crdt::{write_record, CrdtDocument, CrdtError, LoroDocument};
use crate::model::commit::CommitMessage;
use crate::model::projection::ProjectedVegetable;
use crate::model::record::Record;
use crate::model::revision::{
    CausalPosition, DocumentId, DocumentRecord, Evaluation, PersonId, Revision, RevisionId,
};
use crate::model::vegetable::{Locale, VegetableData};
use crate::repo::document_repo::{DocumentRepository, SqliteDocumentRepository};
use crate::repo::projection_repo::{ProjectionRepository, SqliteProjectionRepository};
use crate::repo::revision_repo::{EvaluationRecord, RevisionRepository, SqliteRevisionRepository};
use crate::revision::{
    materialize, merge, validate_update, MergeOutcome, RevisionError, RevisionResult,
};
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Use-case service for the revision workflow.
pub struct RevisionService<'conn> {
    conn: &'conn mut Connection,
    policy: OriginPolicy,
}

impl<'conn> RevisionService<'conn> {
    /// Creates a service with the default origin policy.
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self::with_policy(conn, OriginPolicy::default())
    }

    pub fn with_policy(conn: &'conn mut Connection, policy: OriginPolicy) -> Self {
        Self { conn, policy }
    }

    pub fn policy(&self) -> OriginPolicy {
        self.policy
    }

    /// Creates a canonical document holding `record`.
    ///
    /// # Contract
    /// - `record` must pass validation, else `SchemaValidationFailed`.
    /// - Inserts the document, an `approved` initial revision carrying the full
    ///   history, and the projection in one transaction.
    pub fn create_document(
        &mut self,
        author_id: PersonId,
        record: &VegetableData,
    ) -> RevisionResult<DocumentId> {
        let started_at = Instant::now();
        let result = self.create_document_inner(author_id, record);
        match &result {
            Ok(document_id) => info!(
                "event=document_create module=revision status=ok document_id={} duration_ms={}",
                document_id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=document_create module=revision status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn create_document_inner(
        &mut self,
        author_id: PersonId,
        record: &VegetableData,
    ) -> RevisionResult<DocumentId> {
        record
            .validate()
            .map_err(|err| RevisionError::SchemaValidationFailed(err.to_string()))?;

        let document = LoroDocument::new();
        write_record(&document, record)?;
        let message = CommitMessage::HumanAction {
            person_id: author_id,
        }
        .encode()
        .map_err(|err| CrdtError::Encode(err.to_string()))?;
        let now = now_epoch_ms();
        document.commit(&message, now / 1000);

        let document_id = Uuid::now_v7();
        let full_update = document.export_updates(&Default::default())?;
        let initial = Revision {
            evaluation: Evaluation::Approved,
            evaluator_id: Some(author_id),
            evaluated_at: Some(now),
            ..Revision::pending(
                document_id,
                author_id,
                full_update,
                CausalPosition::default(),
                now,
            )
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        SqliteDocumentRepository::try_new(&tx)?.insert_document(&DocumentRecord {
            id: document_id,
            canonical_snapshot: document.export_snapshot()?,
            current_frontier: document.causal_position(),
            created_at: now,
            updated_at: now,
        })?;
        SqliteRevisionRepository::try_new(&tx)?.insert_revision(&initial)?;
        materialize(&tx, document_id, &document, now)?;
        tx.commit()?;

        Ok(document_id)
    }

    /// Hydrates the canonical document for editing.
    pub fn load_canonical(&self, document_id: DocumentId) -> RevisionResult<LoroDocument> {
        let record = SqliteDocumentRepository::try_new(self.conn)?
            .get_document(document_id)?
            .ok_or(RevisionError::DocumentNotFound(document_id))?;
        Ok(LoroDocument::from_snapshot(&record.canonical_snapshot)?)
    }

    /// Stores `update` as a new pending revision.
    ///
    /// # Contract
    /// - Validates the update against the current canonical document first.
    /// - Never touches canonical state or projections.
    pub fn create_revision(
        &mut self,
        document_id: DocumentId,
        author_id: PersonId,
        update: &[u8],
    ) -> RevisionResult<RevisionId> {
        let started_at = Instant::now();
        let result = self.create_revision_inner(document_id, author_id, update);
        match &result {
            Ok(revision_id) => info!(
                "event=revision_create module=revision status=ok document_id={} revision_id={} update_bytes={} duration_ms={}",
                document_id,
                revision_id,
                update.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=revision_create module=revision status=error document_id={} duration_ms={} error={}",
                document_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn create_revision_inner(
        &mut self,
        document_id: DocumentId,
        author_id: PersonId,
        update: &[u8],
    ) -> RevisionResult<RevisionId> {
        let canonical = self.load_canonical(document_id)?;
        validate_update::<_, VegetableData>(update, &canonical, self.policy)?;

        let revision = Revision::pending(
            document_id,
            author_id,
            update.to_vec(),
            canonical.causal_position(),
            now_epoch_ms(),
        );
        SqliteRevisionRepository::try_new(self.conn)?.insert_revision(&revision)?;
        Ok(revision.id)
    }

    /// Records an evaluation for a pending revision.
    ///
    /// # Contract
    /// - `decision == Pending` fails with `InvalidEvaluation`.
    /// - Unknown revision fails with `RevisionNotFound`.
    /// - Non-pending revision fails with `AlreadyEvaluated`.
    /// - Approval re-validates against the current canonical document before
    ///   merging.
    pub fn evaluate_revision(
        &mut self,
        revision_id: RevisionId,
        decision: Evaluation,
        evaluator_id: PersonId,
        comment: Option<&str>,
    ) -> RevisionResult<()> {
        let started_at = Instant::now();
        let result = self.evaluate_revision_inner(revision_id, decision, evaluator_id, comment);
        match &result {
            Ok(()) => info!(
                "event=revision_evaluate module=revision status=ok revision_id={} decision={} duration_ms={}",
                revision_id,
                decision.as_str(),
                started_at.elapsed().as_millis()
            ),
            Err(err @ (RevisionError::Crdt(_) | RevisionError::Repo(_))) => error!(
                "event=revision_evaluate module=revision status=error revision_id={} decision={} duration_ms={} error={}",
                revision_id,
                decision.as_str(),
                started_at.elapsed().as_millis(),
                err
            ),
            Err(err) => warn!(
                "event=revision_evaluate module=revision status=rejected revision_id={} decision={} duration_ms={} error={}",
                revision_id,
                decision.as_str(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn evaluate_revision_inner(
        &mut self,
        revision_id: RevisionId,
        decision: Evaluation,
        evaluator_id: PersonId,
        comment: Option<&str>,
    ) -> RevisionResult<()> {
        if decision == Evaluation::Pending {
            return Err(RevisionError::InvalidEvaluation);
        }

        let policy = self.policy;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let revisions = SqliteRevisionRepository::try_new(&tx)?;
        let revision = revisions
            .get_revision(revision_id)?
            .ok_or(RevisionError::RevisionNotFound(revision_id))?;
        if revision.evaluation != Evaluation::Pending {
            return Err(RevisionError::AlreadyEvaluated {
                revision_id,
                evaluation: revision.evaluation,
            });
        }

        let now = now_epoch_ms();
        if decision == Evaluation::Approved {
            let documents = SqliteDocumentRepository::try_new(&tx)?;
            let canonical = documents
                .get_document(revision.document_id)?
                .ok_or(RevisionError::DocumentNotFound(revision.document_id))?;
            let current = LoroDocument::from_snapshot(&canonical.canonical_snapshot)?;
            validate_update::<_, VegetableData>(&revision.update, &current, policy)?;

            let MergeOutcome {
                document,
                snapshot,
                frontier,
            } = merge::<LoroDocument>(&canonical.canonical_snapshot, &revision.update)?;
            documents.update_canonical(revision.document_id, &snapshot, &frontier, now)?;
            materialize(&tx, revision.document_id, &document, now)?;
        }

        let marked = revisions.mark_evaluated(
            revision_id,
            &EvaluationRecord {
                evaluation: decision,
                evaluator_id,
                comment,
                evaluated_at: now,
            },
        )?;
        if !marked {
            let evaluation = revisions
                .get_revision(revision_id)?
                .map_or(revision.evaluation, |current| current.evaluation);
            return Err(RevisionError::AlreadyEvaluated {
                revision_id,
                evaluation,
            });
        }

        tx.commit()?;
        Ok(())
    }

    pub fn get_revision(&self, revision_id: RevisionId) -> RevisionResult<Revision> {
        SqliteRevisionRepository::try_new(self.conn)?
            .get_revision(revision_id)?
            .ok_or(RevisionError::RevisionNotFound(revision_id))
    }

    /// Lists revisions of one document, oldest first.
    pub fn list_revisions(&self, document_id: DocumentId) -> RevisionResult<Vec<Revision>> {
        if SqliteDocumentRepository::try_new(self.conn)?
            .get_document(document_id)?
            .is_none()
        {
            return Err(RevisionError::DocumentNotFound(document_id));
        }
        Ok(SqliteRevisionRepository::try_new(self.conn)?.list_revisions(document_id)?)
    }

    /// Reads the projection of one document in `preferred` locale, falling back
    /// to `en`, then `pt`, then `es`.
    pub fn fetch_document(
        &self,
        document_id: DocumentId,
        preferred: Locale,
    ) -> RevisionResult<ProjectedVegetable> {
        SqliteProjectionRepository::try_new(self.conn)?
            .fetch_projection(document_id, preferred)?
            .ok_or(RevisionError::DocumentNotFound(document_id))
    }
}

/// Current time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
