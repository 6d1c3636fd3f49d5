//! Attachment metadata repository (SQLite).
//!
//! Owner rows cascade-delete their documents through foreign keys, so this
//! repository only handles explicit attach/detach.

use crate::model::document::{DocumentInput, DocumentOwner, DocumentRecord};
use crate::model::record::{RecordId, RecordKind};
use crate::model::user::UserId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{ensure_connection_ready, row_optional_uuid, row_uuid};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const TABLE: &str = "documents";

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    maintenance_item_id,
    audit_id,
    title,
    file_name,
    file_url,
    uploaded_by,
    uploaded_at
FROM documents";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "maintenance_item_id",
    "audit_id",
    "file_name",
    "file_url",
    "uploaded_by",
];

pub trait DocumentRepository {
    /// Records an uploaded file against its owner.
    fn attach_document(
        &self,
        owner: DocumentOwner,
        input: &DocumentInput,
        actor: UserId,
    ) -> RepoResult<DocumentRecord>;
    fn get_document(&self, id: RecordId) -> RepoResult<Option<DocumentRecord>>;
    /// Oldest upload first.
    fn list_documents(&self, owner: DocumentOwner) -> RepoResult<Vec<DocumentRecord>>;
    fn delete_document(&self, id: RecordId) -> RepoResult<()>;
}

pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TABLE, REQUIRED_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn attach_document(
        &self,
        owner: DocumentOwner,
        input: &DocumentInput,
        actor: UserId,
    ) -> RepoResult<DocumentRecord> {
        input.validate()?;

        let owner_kind = owner.kind();
        let owner_exists: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1;", owner_kind.table()),
                [owner.id().to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if owner_exists.is_none() {
            return Err(RepoError::NotFound {
                entity: owner_kind.label(),
                id: owner.id(),
            });
        }

        let (maintenance_item_id, audit_id) = owner_columns(owner);
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO documents (
                id,
                maintenance_item_id,
                audit_id,
                title,
                file_name,
                file_url,
                uploaded_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id.to_string(),
                maintenance_item_id,
                audit_id,
                input.title.as_str(),
                input.file_name.as_str(),
                input.file_url.as_str(),
                actor.to_string(),
            ],
        )?;

        self.get_document(id)?.ok_or(RepoError::NotFound {
            entity: "document",
            id,
        })
    }

    fn get_document(&self, id: RecordId) -> RepoResult<Option<DocumentRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }
        Ok(None)
    }

    fn list_documents(&self, owner: DocumentOwner) -> RepoResult<Vec<DocumentRecord>> {
        let column = match owner {
            DocumentOwner::MaintenanceItem(_) => "maintenance_item_id",
            DocumentOwner::Audit(_) => "audit_id",
        };
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL}
             WHERE {column} = ?1
             ORDER BY uploaded_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([owner.id().to_string()])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    fn delete_document(&self, id: RecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "document",
                id,
            });
        }
        Ok(())
    }
}

fn owner_columns(owner: DocumentOwner) -> (Option<String>, Option<String>) {
    match owner {
        DocumentOwner::MaintenanceItem(id) => (Some(id.to_string()), None),
        DocumentOwner::Audit(id) => (None, Some(id.to_string())),
    }
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<DocumentRecord> {
    let maintenance_item_id = row_optional_uuid(row, TABLE, "maintenance_item_id")?;
    let audit_id = row_optional_uuid(row, TABLE, "audit_id")?;
    let owner = match (maintenance_item_id, audit_id) {
        (Some(id), None) => DocumentOwner::from_kind(RecordKind::MaintenanceItem, id),
        (None, Some(id)) => DocumentOwner::from_kind(RecordKind::Audit, id),
        _ => None,
    }
    .ok_or_else(|| {
        RepoError::InvalidData(format!(
            "document must have exactly one owner in {TABLE}.maintenance_item_id/audit_id"
        ))
    })?;

    Ok(DocumentRecord {
        id: row_uuid(row, TABLE, "id")?,
        owner,
        title: row.get("title")?,
        file_name: row.get("file_name")?,
        file_url: row.get("file_url")?,
        uploaded_by: row_uuid(row, TABLE, "uploaded_by")?,
        uploaded_at: row.get("uploaded_at")?,
    })
}
