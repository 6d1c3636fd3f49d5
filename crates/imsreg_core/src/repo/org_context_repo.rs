//! Organizational context repository (SQLite).
//!
//! Objectives persist as a JSON array in `organizational_context.objectives`.
//! Listing is newest first; grouping by category happens in the model.

use crate::model::org_context::{OrganizationalContextEntry, OrganizationalContextInput};
use crate::model::record::{ArchiveView, RecordId, RecordKind};
use crate::model::risk::RiskAssessment;
use crate::model::user::UserId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{
    archive_view_clause, ensure_connection_ready, parse_flag, row_rating, row_stamp, row_uuid,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TABLE: &str = "organizational_context";

const CONTEXT_SELECT_SQL: &str = "SELECT
    id,
    category,
    sub_category,
    issue,
    objectives,
    initial_likelihood,
    initial_severity,
    initial_risk_level,
    controls_recommendations,
    residual_likelihood,
    residual_severity,
    residual_risk_level,
    archived,
    created_by,
    updated_by,
    created_at,
    updated_at
FROM organizational_context";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "category",
    "issue",
    "objectives",
    "initial_risk_level",
    "residual_risk_level",
    "archived",
];

pub trait OrganizationalContextRepository {
    fn create_entry(
        &self,
        input: &OrganizationalContextInput,
        actor: UserId,
    ) -> RepoResult<OrganizationalContextEntry>;
    fn update_entry(
        &self,
        id: RecordId,
        input: &OrganizationalContextInput,
        actor: UserId,
    ) -> RepoResult<OrganizationalContextEntry>;
    fn get_entry(&self, id: RecordId) -> RepoResult<Option<OrganizationalContextEntry>>;
    /// Newest first.
    fn list_entries(&self, view: ArchiveView) -> RepoResult<Vec<OrganizationalContextEntry>>;
}

pub struct SqliteOrganizationalContextRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrganizationalContextRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TABLE, REQUIRED_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl OrganizationalContextRepository for SqliteOrganizationalContextRepository<'_> {
    fn create_entry(
        &self,
        input: &OrganizationalContextInput,
        actor: UserId,
    ) -> RepoResult<OrganizationalContextEntry> {
        input.validate()?;

        let id = Uuid::new_v4();
        let RiskAssessment { initial, residual } = input.risk;
        self.conn.execute(
            "INSERT INTO organizational_context (
                id,
                category,
                sub_category,
                issue,
                objectives,
                initial_likelihood,
                initial_severity,
                initial_risk_level,
                controls_recommendations,
                residual_likelihood,
                residual_severity,
                residual_risk_level,
                archived,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13);",
            params![
                id.to_string(),
                input.category.as_str(),
                input.sub_category.as_deref(),
                input.issue.as_str(),
                objectives_to_db(&input.objectives)?,
                initial.likelihood(),
                initial.severity(),
                initial.level(),
                input.controls_recommendations.as_str(),
                residual.likelihood(),
                residual.severity(),
                residual.level(),
                actor.to_string(),
            ],
        )?;

        load_required_entry(self.conn, id)
    }

    fn update_entry(
        &self,
        id: RecordId,
        input: &OrganizationalContextInput,
        actor: UserId,
    ) -> RepoResult<OrganizationalContextEntry> {
        input.validate()?;

        let RiskAssessment { initial, residual } = input.risk;
        let changed = self.conn.execute(
            "UPDATE organizational_context
             SET
                category = ?2,
                sub_category = ?3,
                issue = ?4,
                objectives = ?5,
                initial_likelihood = ?6,
                initial_severity = ?7,
                initial_risk_level = ?8,
                controls_recommendations = ?9,
                residual_likelihood = ?10,
                residual_severity = ?11,
                residual_risk_level = ?12,
                updated_by = ?13,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                input.category.as_str(),
                input.sub_category.as_deref(),
                input.issue.as_str(),
                objectives_to_db(&input.objectives)?,
                initial.likelihood(),
                initial.severity(),
                initial.level(),
                input.controls_recommendations.as_str(),
                residual.likelihood(),
                residual.severity(),
                residual.level(),
                actor.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }

        load_required_entry(self.conn, id)
    }

    fn get_entry(&self, id: RecordId) -> RepoResult<Option<OrganizationalContextEntry>> {
        load_entry(self.conn, id)
    }

    fn list_entries(&self, view: ArchiveView) -> RepoResult<Vec<OrganizationalContextEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONTEXT_SELECT_SQL}
             WHERE {}
             ORDER BY created_at DESC, rowid DESC;",
            archive_view_clause(view)
        ))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }
}

fn load_entry(conn: &Connection, id: RecordId) -> RepoResult<Option<OrganizationalContextEntry>> {
    let mut stmt = conn.prepare(&format!("{CONTEXT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_entry_row(row)?));
    }
    Ok(None)
}

fn load_required_entry(conn: &Connection, id: RecordId) -> RepoResult<OrganizationalContextEntry> {
    load_entry(conn, id)?.ok_or_else(|| not_found(id))
}

fn not_found(id: RecordId) -> RepoError {
    RepoError::NotFound {
        entity: RecordKind::OrganizationalContext.label(),
        id,
    }
}

fn objectives_to_db(objectives: &[String]) -> RepoResult<String> {
    serde_json::to_string(objectives)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode objectives: {err}")))
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<OrganizationalContextEntry> {
    let objectives_text: String = row.get("objectives")?;
    let objectives: Vec<String> = serde_json::from_str(&objectives_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid objectives `{objectives_text}` in {TABLE}.objectives"
        ))
    })?;

    let initial = row_rating(
        row,
        TABLE,
        "initial_likelihood",
        "initial_severity",
        "initial_risk_level",
    )?;
    let residual = row_rating(
        row,
        TABLE,
        "residual_likelihood",
        "residual_severity",
        "residual_risk_level",
    )?;

    Ok(OrganizationalContextEntry {
        id: row_uuid(row, TABLE, "id")?,
        category: row.get("category")?,
        sub_category: row.get("sub_category")?,
        issue: row.get("issue")?,
        objectives,
        risk: RiskAssessment::new(initial, residual),
        controls_recommendations: row.get("controls_recommendations")?,
        archived: parse_flag(row, TABLE, "archived")?,
        stamp: row_stamp(row, TABLE)?,
    })
}
