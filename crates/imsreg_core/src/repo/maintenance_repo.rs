//! Maintenance and calibration schedule repository (SQLite).
//!
//! Listing is soonest due first: `due_date ASC, name ASC`.

use crate::model::maintenance::{
    MaintenanceItem, MaintenanceItemInput, MaintenanceKind, MaintenanceListQuery,
};
use crate::model::record::{CompletionFilter, RecordId, RecordKind};
use crate::model::user::UserId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{
    archive_view_clause, bool_to_int, ensure_connection_ready, parse_flag, row_optional_uuid,
    row_stamp, row_uuid,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const TABLE: &str = "maintenance_items";

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    kind,
    sub_category,
    name,
    reference,
    serial_number,
    action_required,
    supplier,
    frequency,
    due_date,
    owner_id,
    allocated_to_id,
    completed,
    archived,
    created_by,
    updated_by,
    created_at,
    updated_at
FROM maintenance_items";

const REQUIRED_COLUMNS: &[&str] = &["id", "kind", "name", "due_date", "completed", "archived"];

pub trait MaintenanceRepository {
    fn create_item(&self, input: &MaintenanceItemInput, actor: UserId)
        -> RepoResult<MaintenanceItem>;
    fn update_item(
        &self,
        id: RecordId,
        input: &MaintenanceItemInput,
        actor: UserId,
    ) -> RepoResult<MaintenanceItem>;
    fn get_item(&self, id: RecordId) -> RepoResult<Option<MaintenanceItem>>;
    fn list_items(&self, query: &MaintenanceListQuery) -> RepoResult<Vec<MaintenanceItem>>;
    /// Distinct non-empty sub-categories used by `kind`, sorted.
    fn list_sub_categories(&self, kind: MaintenanceKind) -> RepoResult<Vec<String>>;
}

pub struct SqliteMaintenanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMaintenanceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TABLE, REQUIRED_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl MaintenanceRepository for SqliteMaintenanceRepository<'_> {
    fn create_item(
        &self,
        input: &MaintenanceItemInput,
        actor: UserId,
    ) -> RepoResult<MaintenanceItem> {
        input.validate()?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO maintenance_items (
                id,
                kind,
                sub_category,
                name,
                reference,
                serial_number,
                action_required,
                supplier,
                frequency,
                due_date,
                owner_id,
                allocated_to_id,
                completed,
                archived,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0, ?14);",
            params![
                id.to_string(),
                input.kind.as_db(),
                input.sub_category.as_deref(),
                input.name.as_str(),
                input.reference.as_deref(),
                input.serial_number.as_deref(),
                input.action_required.as_str(),
                input.supplier.as_deref(),
                input.frequency.as_str(),
                input.due_date,
                input.owner.map(|value| value.to_string()),
                input.allocated_to.map(|value| value.to_string()),
                bool_to_int(input.completed),
                actor.to_string(),
            ],
        )?;

        load_required_item(self.conn, id)
    }

    fn update_item(
        &self,
        id: RecordId,
        input: &MaintenanceItemInput,
        actor: UserId,
    ) -> RepoResult<MaintenanceItem> {
        input.validate()?;

        let changed = self.conn.execute(
            "UPDATE maintenance_items
             SET
                kind = ?2,
                sub_category = ?3,
                name = ?4,
                reference = ?5,
                serial_number = ?6,
                action_required = ?7,
                supplier = ?8,
                frequency = ?9,
                due_date = ?10,
                owner_id = ?11,
                allocated_to_id = ?12,
                completed = ?13,
                updated_by = ?14,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                input.kind.as_db(),
                input.sub_category.as_deref(),
                input.name.as_str(),
                input.reference.as_deref(),
                input.serial_number.as_deref(),
                input.action_required.as_str(),
                input.supplier.as_deref(),
                input.frequency.as_str(),
                input.due_date,
                input.owner.map(|value| value.to_string()),
                input.allocated_to.map(|value| value.to_string()),
                bool_to_int(input.completed),
                actor.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }

        load_required_item(self.conn, id)
    }

    fn get_item(&self, id: RecordId) -> RepoResult<Option<MaintenanceItem>> {
        load_item(self.conn, id)
    }

    fn list_items(&self, query: &MaintenanceListQuery) -> RepoResult<Vec<MaintenanceItem>> {
        let mut sql = format!("{ITEM_SELECT_SQL} WHERE {}", archive_view_clause(query.view));
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_db().to_string()));
        }

        if let Some(sub_category) = &query.sub_category {
            sql.push_str(" AND sub_category = ?");
            bind_values.push(Value::Text(sub_category.clone()));
        }

        match query.completion {
            CompletionFilter::All => {}
            CompletionFilter::Open => sql.push_str(" AND completed = 0"),
            CompletionFilter::Completed => sql.push_str(" AND completed = 1"),
        }

        if let Some(owner) = query.owner {
            sql.push_str(" AND owner_id = ?");
            bind_values.push(Value::Text(owner.to_string()));
        }

        if let Some(allocated_to) = query.allocated_to {
            sql.push_str(" AND allocated_to_id = ?");
            bind_values.push(Value::Text(allocated_to.to_string()));
        }

        sql.push_str(" ORDER BY due_date ASC, name ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn list_sub_categories(&self, kind: MaintenanceKind) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT sub_category
             FROM maintenance_items
             WHERE kind = ?1
               AND sub_category IS NOT NULL
               AND sub_category <> ''
             ORDER BY sub_category ASC;",
        )?;
        let mut rows = stmt.query([kind.as_db()])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(row.get(0)?);
        }
        Ok(values)
    }
}

fn load_item(conn: &Connection, id: RecordId) -> RepoResult<Option<MaintenanceItem>> {
    let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_item_row(row)?));
    }
    Ok(None)
}

fn load_required_item(conn: &Connection, id: RecordId) -> RepoResult<MaintenanceItem> {
    load_item(conn, id)?.ok_or_else(|| not_found(id))
}

fn not_found(id: RecordId) -> RepoError {
    RepoError::NotFound {
        entity: RecordKind::MaintenanceItem.label(),
        id,
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<MaintenanceItem> {
    let kind_text: String = row.get("kind")?;
    let kind = MaintenanceKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid schedule kind `{kind_text}` in {TABLE}.kind"))
    })?;

    Ok(MaintenanceItem {
        id: row_uuid(row, TABLE, "id")?,
        kind,
        sub_category: row.get("sub_category")?,
        name: row.get("name")?,
        reference: row.get("reference")?,
        serial_number: row.get("serial_number")?,
        action_required: row.get("action_required")?,
        supplier: row.get("supplier")?,
        frequency: row.get("frequency")?,
        due_date: row.get("due_date")?,
        owner: row_optional_uuid(row, TABLE, "owner_id")?,
        allocated_to: row_optional_uuid(row, TABLE, "allocated_to_id")?,
        completed: parse_flag(row, TABLE, "completed")?,
        archived: parse_flag(row, TABLE, "archived")?,
        stamp: row_stamp(row, TABLE)?,
    })
}
