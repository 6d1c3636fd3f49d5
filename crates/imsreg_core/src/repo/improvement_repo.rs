//! Improvement register repository (SQLite).
//!
//! # Invariants
//! - `number` is assigned as `max(number) + 1` inside the inserting
//!   transaction; archived entries keep their number.
//! - Listing is newest report first: `number DESC`.

use crate::model::improvement::{
    Improvement, ImprovementInput, ImprovementListQuery, ImprovementType,
};
use crate::model::record::{CompletionFilter, RecordId, RecordKind};
use crate::model::user::UserId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{
    archive_view_clause, ensure_connection_ready, parse_flag, row_optional_uuid, row_stamp,
    row_uuid,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const TABLE: &str = "improvements";

const IMPROVEMENT_SELECT_SQL: &str = "SELECT
    id,
    number,
    category,
    improvement_type,
    description,
    root_cause_type,
    corrective_action,
    internal_owner_id,
    external_owner,
    date_raised,
    date_due,
    date_completed,
    archived,
    created_by,
    updated_by,
    created_at,
    updated_at
FROM improvements";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "number",
    "category",
    "improvement_type",
    "date_raised",
    "date_completed",
    "archived",
];

pub trait ImprovementRepository {
    /// Inserts with the next report number.
    fn create_improvement(&self, input: &ImprovementInput, actor: UserId)
        -> RepoResult<Improvement>;
    /// Replaces editable fields; the report number is kept.
    fn update_improvement(
        &self,
        id: RecordId,
        input: &ImprovementInput,
        actor: UserId,
    ) -> RepoResult<Improvement>;
    fn get_improvement(&self, id: RecordId) -> RepoResult<Option<Improvement>>;
    fn list_improvements(&self, query: &ImprovementListQuery) -> RepoResult<Vec<Improvement>>;
    /// Highest report number ever stored, `0` for an empty register.
    fn latest_number(&self) -> RepoResult<i64>;
}

pub struct SqliteImprovementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteImprovementRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TABLE, REQUIRED_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl ImprovementRepository for SqliteImprovementRepository<'_> {
    fn create_improvement(
        &self,
        input: &ImprovementInput,
        actor: UserId,
    ) -> RepoResult<Improvement> {
        input.validate()?;

        let id = Uuid::new_v4();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let number = max_number(&tx)? + 1;
        tx.execute(
            "INSERT INTO improvements (
                id,
                number,
                category,
                improvement_type,
                description,
                root_cause_type,
                corrective_action,
                internal_owner_id,
                external_owner,
                date_raised,
                date_due,
                date_completed,
                archived,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13);",
            params![
                id.to_string(),
                number,
                input.category.as_str(),
                input.improvement_type.as_db(),
                input.description.as_str(),
                input.root_cause_type.as_deref(),
                input.corrective_action.as_deref(),
                input.internal_owner.map(|value| value.to_string()),
                input.external_owner.as_deref(),
                input.date_raised,
                input.date_due,
                input.date_completed,
                actor.to_string(),
            ],
        )?;
        tx.commit()?;

        load_required_improvement(self.conn, id)
    }

    fn update_improvement(
        &self,
        id: RecordId,
        input: &ImprovementInput,
        actor: UserId,
    ) -> RepoResult<Improvement> {
        input.validate()?;

        let changed = self.conn.execute(
            "UPDATE improvements
             SET
                category = ?2,
                improvement_type = ?3,
                description = ?4,
                root_cause_type = ?5,
                corrective_action = ?6,
                internal_owner_id = ?7,
                external_owner = ?8,
                date_raised = ?9,
                date_due = ?10,
                date_completed = ?11,
                updated_by = ?12,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                input.category.as_str(),
                input.improvement_type.as_db(),
                input.description.as_str(),
                input.root_cause_type.as_deref(),
                input.corrective_action.as_deref(),
                input.internal_owner.map(|value| value.to_string()),
                input.external_owner.as_deref(),
                input.date_raised,
                input.date_due,
                input.date_completed,
                actor.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }

        load_required_improvement(self.conn, id)
    }

    fn get_improvement(&self, id: RecordId) -> RepoResult<Option<Improvement>> {
        load_improvement(self.conn, id)
    }

    fn list_improvements(&self, query: &ImprovementListQuery) -> RepoResult<Vec<Improvement>> {
        let mut sql = format!(
            "{IMPROVEMENT_SELECT_SQL} WHERE {}",
            archive_view_clause(query.view)
        );
        let mut bind_values: Vec<Value> = Vec::new();

        match query.completion {
            CompletionFilter::All => {}
            CompletionFilter::Open => sql.push_str(" AND date_completed IS NULL"),
            CompletionFilter::Completed => sql.push_str(" AND date_completed IS NOT NULL"),
        }

        if let Some(category) = &query.category {
            sql.push_str(" AND category = ?");
            bind_values.push(Value::Text(category.clone()));
        }

        if let Some(kind) = query.improvement_type {
            sql.push_str(" AND improvement_type = ?");
            bind_values.push(Value::Text(kind.as_db().to_string()));
        }

        if let Some(root_cause) = &query.root_cause_type {
            sql.push_str(" AND root_cause_type = ?");
            bind_values.push(Value::Text(root_cause.clone()));
        }

        sql.push_str(" ORDER BY number DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut improvements = Vec::new();
        while let Some(row) = rows.next()? {
            improvements.push(parse_improvement_row(row)?);
        }
        Ok(improvements)
    }

    fn latest_number(&self) -> RepoResult<i64> {
        max_number(self.conn)
    }
}

fn max_number(conn: &Connection) -> RepoResult<i64> {
    let number = conn.query_row(
        "SELECT COALESCE(MAX(number), 0) FROM improvements;",
        [],
        |row| row.get(0),
    )?;
    Ok(number)
}

fn load_improvement(conn: &Connection, id: RecordId) -> RepoResult<Option<Improvement>> {
    let mut stmt = conn.prepare(&format!("{IMPROVEMENT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_improvement_row(row)?));
    }
    Ok(None)
}

fn load_required_improvement(conn: &Connection, id: RecordId) -> RepoResult<Improvement> {
    load_improvement(conn, id)?.ok_or_else(|| not_found(id))
}

fn not_found(id: RecordId) -> RepoError {
    RepoError::NotFound {
        entity: RecordKind::Improvement.label(),
        id,
    }
}

fn parse_improvement_row(row: &Row<'_>) -> RepoResult<Improvement> {
    let type_text: String = row.get("improvement_type")?;
    let improvement_type = ImprovementType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid improvement type `{type_text}` in {TABLE}.improvement_type"
        ))
    })?;

    Ok(Improvement {
        id: row_uuid(row, TABLE, "id")?,
        number: row.get("number")?,
        category: row.get("category")?,
        improvement_type,
        description: row.get("description")?,
        root_cause_type: row.get("root_cause_type")?,
        corrective_action: row.get("corrective_action")?,
        internal_owner: row_optional_uuid(row, TABLE, "internal_owner_id")?,
        external_owner: row.get("external_owner")?,
        date_raised: row.get("date_raised")?,
        date_due: row.get("date_due")?,
        date_completed: row.get("date_completed")?,
        archived: parse_flag(row, TABLE, "archived")?,
        stamp: row_stamp(row, TABLE)?,
    })
}
