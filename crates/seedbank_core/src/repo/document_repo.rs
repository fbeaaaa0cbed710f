//! Canonical document repository.
//!
//! # Responsibility
//! - Persist one canonical snapshot and frontier per document.
//!
//! # Invariants
//! - `update_canonical` is only called from the approval path.
//! - Snapshot bytes are stored as opaque blobs.

use crate::model::revision::{CausalPosition, DocumentId, DocumentRecord};
use crate::repo::{ensure_table_columns, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for canonical documents.
pub trait DocumentRepository {
    fn insert_document(&self, document: &DocumentRecord) -> RepoResult<()>;
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<DocumentRecord>>;
    /// Replaces snapshot and frontier of an existing document.
    fn update_canonical(
        &self,
        id: DocumentId,
        snapshot: &[u8],
        frontier: &CausalPosition,
        updated_at: i64,
    ) -> RepoResult<()>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_columns(
            conn,
            "documents",
            &[
                "id",
                "canonical_snapshot",
                "current_frontier",
                "created_at",
                "updated_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn insert_document(&self, document: &DocumentRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO documents (
                id,
                canonical_snapshot,
                current_frontier,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                document.id.to_string(),
                document.canonical_snapshot,
                document.current_frontier.to_json_string(),
                document.created_at,
                document.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<DocumentRecord>> {
        self.conn
            .query_row(
                "SELECT
                    id,
                    canonical_snapshot,
                    current_frontier,
                    created_at,
                    updated_at
                 FROM documents
                 WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_document_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn update_canonical(
        &self,
        id: DocumentId,
        snapshot: &[u8],
        frontier: &CausalPosition,
        updated_at: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                canonical_snapshot = ?2,
                current_frontier = ?3,
                updated_at = ?4
             WHERE id = ?1;",
            params![
                id.to_string(),
                snapshot,
                frontier.to_json_string(),
                updated_at
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<DocumentRecord> {
    let id_text: String = row.get("id")?;
    let frontier_text: String = row.get("current_frontier")?;
    let current_frontier = CausalPosition::from_json_str(&frontier_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid documents.current_frontier: {err}"))
    })?;

    Ok(DocumentRecord {
        id: parse_uuid(&id_text, "documents.id")?,
        canonical_snapshot: row.get("canonical_snapshot")?,
        current_frontier,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
