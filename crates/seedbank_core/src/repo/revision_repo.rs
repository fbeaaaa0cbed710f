//! Revision repository.
//!
//! # Responsibility
//! - Persist proposed revisions and their single evaluation.
//!
//! # Invariants
//! - `mark_evaluated` only changes rows still in `pending`; the guard lives in
//!   the `WHERE` clause so concurrent evaluators cannot both succeed.
//! - Update bytes are stored as opaque blobs.

use crate::model::revision::{
    CausalPosition, DocumentId, Evaluation, PersonId, Revision, RevisionId,
};
use crate::repo::{ensure_table_columns, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const REVISION_SELECT_SQL: &str = "SELECT
    id,
    document_id,
    author_id,
    crdt_update,
    base_version,
    evaluation,
    evaluator_id,
    evaluation_comment,
    created_at,
    evaluated_at
FROM revisions";

/// Evaluation written by `mark_evaluated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRecord<'a> {
    pub evaluation: Evaluation,
    pub evaluator_id: PersonId,
    pub comment: Option<&'a str>,
    pub evaluated_at: i64,
}

/// Repository interface for revisions.
pub trait RevisionRepository {
    fn insert_revision(&self, revision: &Revision) -> RepoResult<()>;
    fn get_revision(&self, id: RevisionId) -> RepoResult<Option<Revision>>;
    /// Lists revisions of one document, oldest first.
    fn list_revisions(&self, document_id: DocumentId) -> RepoResult<Vec<Revision>>;
    /// Moves a pending revision to a terminal state.
    ///
    /// Returns `false` when the revision was not pending (or does not exist).
    fn mark_evaluated(&self, id: RevisionId, record: &EvaluationRecord<'_>) -> RepoResult<bool>;
}

/// SQLite-backed revision repository.
pub struct SqliteRevisionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRevisionRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_columns(
            conn,
            "revisions",
            &[
                "id",
                "document_id",
                "author_id",
                "crdt_update",
                "base_version",
                "evaluation",
                "evaluator_id",
                "evaluation_comment",
                "created_at",
                "evaluated_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl RevisionRepository for SqliteRevisionRepository<'_> {
    fn insert_revision(&self, revision: &Revision) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO revisions (
                id,
                document_id,
                author_id,
                crdt_update,
                base_version,
                evaluation,
                evaluator_id,
                evaluation_comment,
                created_at,
                evaluated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                revision.id.to_string(),
                revision.document_id.to_string(),
                revision.author_id.to_string(),
                revision.update,
                revision.base_version.to_json_string(),
                revision.evaluation.as_str(),
                revision.evaluator_id.map(|id| id.to_string()),
                revision.evaluation_comment,
                revision.created_at,
                revision.evaluated_at,
            ],
        )?;
        Ok(())
    }

    fn get_revision(&self, id: RevisionId) -> RepoResult<Option<Revision>> {
        self.conn
            .query_row(
                &format!("{REVISION_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_revision_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_revisions(&self, document_id: DocumentId) -> RepoResult<Vec<Revision>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REVISION_SELECT_SQL} WHERE document_id = ?1 ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([document_id.to_string()])?;
        let mut revisions = Vec::new();
        while let Some(row) = rows.next()? {
            revisions.push(parse_revision_row(row)?);
        }
        Ok(revisions)
    }

    fn mark_evaluated(&self, id: RevisionId, record: &EvaluationRecord<'_>) -> RepoResult<bool> {
        if !record.evaluation.is_terminal() {
            return Err(RepoError::InvalidData(
                "revisions can only be marked approved or rejected".to_string(),
            ));
        }

        let changed = self.conn.execute(
            "UPDATE revisions
             SET
                evaluation = ?2,
                evaluator_id = ?3,
                evaluation_comment = ?4,
                evaluated_at = ?5
             WHERE id = ?1
               AND evaluation = 'pending';",
            params![
                id.to_string(),
                record.evaluation.as_str(),
                record.evaluator_id.to_string(),
                record.comment,
                record.evaluated_at,
            ],
        )?;
        Ok(changed == 1)
    }
}

fn parse_revision_row(row: &Row<'_>) -> RepoResult<Revision> {
    let id_text: String = row.get("id")?;
    let document_text: String = row.get("document_id")?;
    let author_text: String = row.get("author_id")?;

    let base_text: String = row.get("base_version")?;
    let base_version = CausalPosition::from_json_str(&base_text)
        .map_err(|err| RepoError::InvalidData(format!("invalid revisions.base_version: {err}")))?;

    let evaluation_text: String = row.get("evaluation")?;
    let evaluation = Evaluation::parse(&evaluation_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid evaluation `{evaluation_text}` in revisions.evaluation"
        ))
    })?;

    let evaluator_id = match row.get::<_, Option<String>>("evaluator_id")? {
        Some(value) => Some(parse_uuid(&value, "revisions.evaluator_id")?),
        None => None,
    };

    Ok(Revision {
        id: parse_uuid(&id_text, "revisions.id")?,
        document_id: parse_uuid(&document_text, "revisions.document_id")?,
        author_id: parse_uuid(&author_text, "revisions.author_id")?,
        update: row.get("crdt_update")?,
        base_version,
        evaluation,
        evaluator_id,
        evaluation_comment: row.get("evaluation_comment")?,
        created_at: row.get("created_at")?,
        evaluated_at: row.get("evaluated_at")?,
    })
}
