//! Audit schedule repository (SQLite).
//!
//! # Responsibility
//! - Persist audits together with their controlled-document references.
//! - Schedule the follow-on audit when a new audit requests one.
//!
//! # Invariants
//! - Stored `status` is `completed` whenever `date_completed` is set.
//! - An audit row, its document references and any follow-on audit are
//!   written in one `IMMEDIATE` transaction.
//! - Updates never schedule a follow-on audit; re-saving an edit form that
//!   still carries the request leaves the schedule as it is.
//! - Listing is by planned start (unplanned last), then title.

use crate::model::audit::{
    Audit, AuditDocType, AuditDocumentRef, AuditInput, AuditListQuery, AuditStatus,
};
use crate::model::record::{RecordId, RecordKind};
use crate::model::user::UserId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{
    archive_view_clause, ensure_connection_ready, parse_flag, row_optional_uuid, row_stamp,
    row_uuid,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const TABLE: &str = "audits";

const AUDIT_SELECT_SQL: &str = "SELECT
    id,
    title,
    auditor_id,
    external_auditor,
    planned_start_date,
    actual_start_date,
    follow_up_date,
    date_completed,
    status,
    archived,
    created_by,
    updated_by,
    created_at,
    updated_at
FROM audits";

const REQUIRED_COLUMNS: &[&str] = &["id", "title", "status", "date_completed", "archived"];

/// Result of an audit write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAudit {
    pub audit: Audit,
    /// Follow-on audit created by the same write, if requested.
    pub scheduled_next: Option<Audit>,
}

pub trait AuditRepository {
    fn create_audit(&self, input: &AuditInput, actor: UserId) -> RepoResult<SavedAudit>;
    /// Replaces editable fields and the full document reference set.
    ///
    /// Any follow-on request in `input` is ignored.
    fn update_audit(
        &self,
        id: RecordId,
        input: &AuditInput,
        actor: UserId,
    ) -> RepoResult<SavedAudit>;
    fn get_audit(&self, id: RecordId) -> RepoResult<Option<Audit>>;
    fn list_audits(&self, query: &AuditListQuery) -> RepoResult<Vec<Audit>>;
}

pub struct SqliteAuditRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TABLE, REQUIRED_COLUMNS)?;
        ensure_connection_ready(conn, "audit_documents", &["audit_id", "doc_type", "doc_id"])?;
        Ok(Self { conn })
    }
}

impl AuditRepository for SqliteAuditRepository<'_> {
    fn create_audit(&self, input: &AuditInput, actor: UserId) -> RepoResult<SavedAudit> {
        input.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let id = insert_audit(&tx, input, actor)?;
        let next_id = schedule_next(&tx, input, actor)?;
        tx.commit()?;

        saved(self.conn, id, next_id)
    }

    fn update_audit(
        &self,
        id: RecordId,
        input: &AuditInput,
        actor: UserId,
    ) -> RepoResult<SavedAudit> {
        input.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE audits
             SET
                title = ?2,
                auditor_id = ?3,
                external_auditor = ?4,
                planned_start_date = ?5,
                actual_start_date = ?6,
                follow_up_date = ?7,
                date_completed = ?8,
                status = ?9,
                updated_by = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                input.title.as_str(),
                input.auditor.map(|value| value.to_string()),
                input.external_auditor.as_deref(),
                input.planned_start_date,
                input.actual_start_date,
                input.follow_up_date,
                input.date_completed,
                input.resolved_status().as_db(),
                actor.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }

        tx.execute(
            "DELETE FROM audit_documents WHERE audit_id = ?1;",
            [id.to_string()],
        )?;
        insert_documents(&tx, id, &input.documents)?;
        tx.commit()?;

        saved(self.conn, id, None)
    }

    fn get_audit(&self, id: RecordId) -> RepoResult<Option<Audit>> {
        load_audit(self.conn, id)
    }

    fn list_audits(&self, query: &AuditListQuery) -> RepoResult<Vec<Audit>> {
        let mut sql = format!("{AUDIT_SELECT_SQL} WHERE {}", archive_view_clause(query.view));
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_db().to_string()));
        }

        sql.push_str(
            " ORDER BY planned_start_date IS NULL ASC, planned_start_date ASC, title ASC, id ASC",
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut audits = Vec::new();
        while let Some(row) = rows.next()? {
            audits.push(parse_audit_row(row)?);
        }
        drop(rows);

        for audit in &mut audits {
            audit.documents = load_documents(self.conn, audit.id)?;
        }
        Ok(audits)
    }
}

fn insert_audit(conn: &Connection, input: &AuditInput, actor: UserId) -> RepoResult<RecordId> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO audits (
            id,
            title,
            auditor_id,
            external_auditor,
            planned_start_date,
            actual_start_date,
            follow_up_date,
            date_completed,
            status,
            archived,
            created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10);",
        params![
            id.to_string(),
            input.title.as_str(),
            input.auditor.map(|value| value.to_string()),
            input.external_auditor.as_deref(),
            input.planned_start_date,
            input.actual_start_date,
            input.follow_up_date,
            input.date_completed,
            input.resolved_status().as_db(),
            actor.to_string(),
        ],
    )?;
    insert_documents(conn, id, &input.documents)?;
    Ok(id)
}

fn schedule_next(
    conn: &Connection,
    input: &AuditInput,
    actor: UserId,
) -> RepoResult<Option<RecordId>> {
    match input.next_audit() {
        Some(next) => Ok(Some(insert_audit(conn, &next, actor)?)),
        None => Ok(None),
    }
}

fn insert_documents(
    conn: &Connection,
    audit_id: RecordId,
    documents: &[AuditDocumentRef],
) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO audit_documents (audit_id, doc_type, doc_id)
         VALUES (?1, ?2, ?3);",
    )?;
    for document in documents {
        stmt.execute(params![
            audit_id.to_string(),
            document.doc_type.as_db(),
            document.doc_id.as_str(),
        ])?;
    }
    Ok(())
}

fn load_documents(conn: &Connection, audit_id: RecordId) -> RepoResult<Vec<AuditDocumentRef>> {
    let mut stmt = conn.prepare(
        "SELECT doc_type, doc_id
         FROM audit_documents
         WHERE audit_id = ?1;",
    )?;
    let mut rows = stmt.query([audit_id.to_string()])?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next()? {
        let type_text: String = row.get(0)?;
        let doc_type = AuditDocType::parse(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid document type `{type_text}` in audit_documents.doc_type"
            ))
        })?;
        documents.push(AuditDocumentRef {
            doc_type,
            doc_id: row.get(1)?,
        });
    }
    documents.sort();
    Ok(documents)
}

fn load_audit(conn: &Connection, id: RecordId) -> RepoResult<Option<Audit>> {
    let mut stmt = conn.prepare(&format!("{AUDIT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut audit = parse_audit_row(row)?;
    audit.documents = load_documents(conn, id)?;
    Ok(Some(audit))
}

fn saved(conn: &Connection, id: RecordId, next_id: Option<RecordId>) -> RepoResult<SavedAudit> {
    let audit = load_audit(conn, id)?.ok_or_else(|| not_found(id))?;
    let scheduled_next = match next_id {
        Some(next_id) => Some(load_audit(conn, next_id)?.ok_or_else(|| not_found(next_id))?),
        None => None,
    };
    Ok(SavedAudit {
        audit,
        scheduled_next,
    })
}

fn not_found(id: RecordId) -> RepoError {
    RepoError::NotFound {
        entity: RecordKind::Audit.label(),
        id,
    }
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<Audit> {
    let status_text: String = row.get("status")?;
    let status = AuditStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid audit status `{status_text}` in {TABLE}.status"))
    })?;

    Ok(Audit {
        id: row_uuid(row, TABLE, "id")?,
        title: row.get("title")?,
        auditor: row_optional_uuid(row, TABLE, "auditor_id")?,
        external_auditor: row.get("external_auditor")?,
        planned_start_date: row.get("planned_start_date")?,
        actual_start_date: row.get("actual_start_date")?,
        follow_up_date: row.get("follow_up_date")?,
        date_completed: row.get("date_completed")?,
        status,
        documents: Vec::new(),
        archived: parse_flag(row, TABLE, "archived")?,
        stamp: row_stamp(row, TABLE)?,
    })
}
