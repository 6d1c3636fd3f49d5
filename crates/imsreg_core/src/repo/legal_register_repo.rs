//! Legal register repository (SQLite): entries, approval and reviews.
//!
//! # Invariants
//! - New entries are stored unapproved.
//! - `latest_review` is the review with the greatest `review_date`
//!   (latest insert wins ties).
//! - Views list newest entries first.

use crate::model::legal_register::{
    LegalRegisterEntry, LegalRegisterInput, LegalRegisterViews, LegalReview, LegalReviewInput,
};
use crate::model::record::{RecordId, RecordKind};
use crate::model::user::UserId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{ensure_connection_ready, parse_flag, row_stamp, row_uuid};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TABLE: &str = "legal_register";
const REVIEW_TABLE: &str = "legal_register_reviews";

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    title,
    legislation,
    requirements,
    approved,
    archived,
    created_by,
    updated_by,
    created_at,
    updated_at
FROM legal_register";

const REVIEW_SELECT_SQL: &str = "SELECT
    id,
    legal_register_id,
    review_date,
    reviewed_by,
    notes,
    created_at
FROM legal_register_reviews";

const REQUIRED_COLUMNS: &[&str] = &["id", "title", "approved", "archived"];

pub trait LegalRegisterRepository {
    fn create_entry(&self, input: &LegalRegisterInput, actor: UserId)
        -> RepoResult<LegalRegisterEntry>;
    fn update_entry(
        &self,
        id: RecordId,
        input: &LegalRegisterInput,
        actor: UserId,
    ) -> RepoResult<LegalRegisterEntry>;
    /// Loads one entry with its latest review.
    fn get_entry(&self, id: RecordId) -> RepoResult<Option<LegalRegisterEntry>>;
    fn load_views(&self) -> RepoResult<LegalRegisterViews>;
    fn approve_entry(&self, id: RecordId, actor: UserId) -> RepoResult<LegalRegisterEntry>;
    fn add_review(
        &self,
        id: RecordId,
        input: &LegalReviewInput,
        actor: UserId,
    ) -> RepoResult<LegalReview>;
    /// All reviews for one entry, newest review date first.
    fn list_reviews(&self, id: RecordId) -> RepoResult<Vec<LegalReview>>;
}

pub struct SqliteLegalRegisterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLegalRegisterRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TABLE, REQUIRED_COLUMNS)?;
        ensure_connection_ready(
            conn,
            REVIEW_TABLE,
            &["id", "legal_register_id", "review_date", "reviewed_by"],
        )?;
        Ok(Self { conn })
    }
}

impl LegalRegisterRepository for SqliteLegalRegisterRepository<'_> {
    fn create_entry(
        &self,
        input: &LegalRegisterInput,
        actor: UserId,
    ) -> RepoResult<LegalRegisterEntry> {
        input.validate()?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO legal_register (
                id,
                title,
                legislation,
                requirements,
                approved,
                archived,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5);",
            params![
                id.to_string(),
                input.title.as_str(),
                input.legislation.as_str(),
                input.requirements.as_str(),
                actor.to_string(),
            ],
        )?;

        load_required_entry(self.conn, id)
    }

    fn update_entry(
        &self,
        id: RecordId,
        input: &LegalRegisterInput,
        actor: UserId,
    ) -> RepoResult<LegalRegisterEntry> {
        input.validate()?;

        let changed = self.conn.execute(
            "UPDATE legal_register
             SET
                title = ?2,
                legislation = ?3,
                requirements = ?4,
                updated_by = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                input.title.as_str(),
                input.legislation.as_str(),
                input.requirements.as_str(),
                actor.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }

        load_required_entry(self.conn, id)
    }

    fn get_entry(&self, id: RecordId) -> RepoResult<Option<LegalRegisterEntry>> {
        load_entry(self.conn, id)
    }

    fn load_views(&self) -> RepoResult<LegalRegisterViews> {
        Ok(LegalRegisterViews {
            approved: list_where(self.conn, "archived = 0 AND approved = 1", true)?,
            awaiting_approval: list_where(self.conn, "archived = 0 AND approved = 0", false)?,
            archived: list_where(self.conn, "archived = 1", true)?,
        })
    }

    fn approve_entry(&self, id: RecordId, actor: UserId) -> RepoResult<LegalRegisterEntry> {
        let changed = self.conn.execute(
            "UPDATE legal_register
             SET
                approved = 1,
                updated_by = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), actor.to_string()],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }

        load_required_entry(self.conn, id)
    }

    fn add_review(
        &self,
        id: RecordId,
        input: &LegalReviewInput,
        actor: UserId,
    ) -> RepoResult<LegalReview> {
        if load_entry(self.conn, id)?.is_none() {
            return Err(not_found(id));
        }

        let review_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO legal_register_reviews (
                id,
                legal_register_id,
                review_date,
                reviewed_by,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                review_id.to_string(),
                id.to_string(),
                input.review_date,
                actor.to_string(),
                input.notes.as_str(),
            ],
        )?;

        let mut stmt = self
            .conn
            .prepare(&format!("{REVIEW_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([review_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return parse_review_row(row);
        }
        Err(RepoError::InvalidData(format!(
            "review {review_id} missing after insert"
        )))
    }

    fn list_reviews(&self, id: RecordId) -> RepoResult<Vec<LegalReview>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REVIEW_SELECT_SQL}
             WHERE legal_register_id = ?1
             ORDER BY review_date DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut reviews = Vec::new();
        while let Some(row) = rows.next()? {
            reviews.push(parse_review_row(row)?);
        }
        Ok(reviews)
    }
}

fn list_where(
    conn: &Connection,
    predicate: &str,
    with_latest_review: bool,
) -> RepoResult<Vec<LegalRegisterEntry>> {
    let mut stmt = conn.prepare(&format!(
        "{ENTRY_SELECT_SQL}
         WHERE {predicate}
         ORDER BY created_at DESC, rowid DESC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(parse_entry_row(row)?);
    }

    if with_latest_review {
        for entry in &mut entries {
            entry.latest_review = latest_review(conn, entry.id)?;
        }
    }
    Ok(entries)
}

fn latest_review(conn: &Connection, id: RecordId) -> RepoResult<Option<LegalReview>> {
    let mut stmt = conn.prepare(&format!(
        "{REVIEW_SELECT_SQL}
         WHERE legal_register_id = ?1
         ORDER BY review_date DESC, rowid DESC
         LIMIT 1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_review_row(row)?));
    }
    Ok(None)
}

fn load_entry(conn: &Connection, id: RecordId) -> RepoResult<Option<LegalRegisterEntry>> {
    let mut stmt = conn.prepare(&format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut entry = parse_entry_row(row)?;
    entry.latest_review = latest_review(conn, id)?;
    Ok(Some(entry))
}

fn load_required_entry(conn: &Connection, id: RecordId) -> RepoResult<LegalRegisterEntry> {
    load_entry(conn, id)?.ok_or_else(|| not_found(id))
}

fn not_found(id: RecordId) -> RepoError {
    RepoError::NotFound {
        entity: RecordKind::LegalRegister.label(),
        id,
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<LegalRegisterEntry> {
    Ok(LegalRegisterEntry {
        id: row_uuid(row, TABLE, "id")?,
        title: row.get("title")?,
        legislation: row.get("legislation")?,
        requirements: row.get("requirements")?,
        approved: parse_flag(row, TABLE, "approved")?,
        archived: parse_flag(row, TABLE, "archived")?,
        stamp: row_stamp(row, TABLE)?,
        latest_review: None,
    })
}

fn parse_review_row(row: &Row<'_>) -> RepoResult<LegalReview> {
    Ok(LegalReview {
        id: row_uuid(row, REVIEW_TABLE, "id")?,
        legal_register_id: row_uuid(row, REVIEW_TABLE, "legal_register_id")?,
        review_date: row.get("review_date")?,
        reviewed_by: row_uuid(row, REVIEW_TABLE, "reviewed_by")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    })
}
