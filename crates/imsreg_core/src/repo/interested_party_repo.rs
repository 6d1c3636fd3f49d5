//! Interested party repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist interested parties with their derived risk levels.
//! - Own order-key assignment and the single-step reorder swap.
//!
//! # Invariants
//! - Write paths call `InterestedPartyInput::validate()` before SQL.
//! - Listing is deterministic: `archived ASC, sort_order ASC, id ASC`.
//! - Create and reorder run inside one `IMMEDIATE` transaction.

use crate::model::interested_party::{
    InterestedParty, InterestedPartyInput, MoveDirection, ReorderOutcome,
};
use crate::model::record::{ArchiveView, RecordId, RecordKind};
use crate::model::risk::RiskAssessment;
use crate::model::user::UserId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::lifecycle::next_active_order;
use crate::repo::sql::{
    archive_view_clause, ensure_connection_ready, parse_flag, parse_uuid, row_rating, row_stamp,
    row_uuid,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const TABLE: &str = "interested_parties";

const PARTY_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    needs_expectations,
    controls_recommendations,
    initial_likelihood,
    initial_severity,
    risk_level,
    residual_likelihood,
    residual_severity,
    residual_risk_level,
    sort_order,
    archived,
    created_by,
    updated_by,
    created_at,
    updated_at
FROM interested_parties";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "name",
    "initial_likelihood",
    "initial_severity",
    "risk_level",
    "residual_likelihood",
    "residual_severity",
    "residual_risk_level",
    "sort_order",
    "archived",
];

/// Repository interface for interested parties.
pub trait InterestedPartyRepository {
    /// Inserts a party at the end of the active order.
    fn create_party(
        &self,
        input: &InterestedPartyInput,
        actor: UserId,
    ) -> RepoResult<InterestedParty>;
    /// Replaces editable fields and recomputes risk levels.
    fn update_party(
        &self,
        id: RecordId,
        input: &InterestedPartyInput,
        actor: UserId,
    ) -> RepoResult<InterestedParty>;
    fn get_party(&self, id: RecordId) -> RepoResult<Option<InterestedParty>>;
    /// Lists parties in display order; archived rows follow active ones.
    fn list_parties(&self, view: ArchiveView) -> RepoResult<Vec<InterestedParty>>;
    /// Swaps order keys with the neighbor in `direction`.
    fn reorder_party(
        &self,
        id: RecordId,
        direction: MoveDirection,
        actor: UserId,
    ) -> RepoResult<ReorderOutcome>;
}

/// SQLite-backed interested party repository.
pub struct SqliteInterestedPartyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInterestedPartyRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TABLE, REQUIRED_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl InterestedPartyRepository for SqliteInterestedPartyRepository<'_> {
    fn create_party(
        &self,
        input: &InterestedPartyInput,
        actor: UserId,
    ) -> RepoResult<InterestedParty> {
        input.validate()?;

        let id = Uuid::new_v4();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let order = next_active_order(&tx, RecordKind::InterestedParty)?;
        let RiskAssessment { initial, residual } = input.risk;
        tx.execute(
            "INSERT INTO interested_parties (
                id,
                name,
                description,
                needs_expectations,
                controls_recommendations,
                initial_likelihood,
                initial_severity,
                risk_level,
                residual_likelihood,
                residual_severity,
                residual_risk_level,
                sort_order,
                archived,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13);",
            params![
                id.to_string(),
                input.name.as_str(),
                input.description.as_str(),
                input.needs_expectations.as_str(),
                input.controls_recommendations.as_str(),
                initial.likelihood(),
                initial.severity(),
                initial.level(),
                residual.likelihood(),
                residual.severity(),
                residual.level(),
                order,
                actor.to_string(),
            ],
        )?;
        tx.commit()?;

        load_required_party(self.conn, id)
    }

    fn update_party(
        &self,
        id: RecordId,
        input: &InterestedPartyInput,
        actor: UserId,
    ) -> RepoResult<InterestedParty> {
        input.validate()?;

        let RiskAssessment { initial, residual } = input.risk;
        let changed = self.conn.execute(
            "UPDATE interested_parties
             SET
                name = ?2,
                description = ?3,
                needs_expectations = ?4,
                controls_recommendations = ?5,
                initial_likelihood = ?6,
                initial_severity = ?7,
                risk_level = ?8,
                residual_likelihood = ?9,
                residual_severity = ?10,
                residual_risk_level = ?11,
                updated_by = ?12,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                input.name.as_str(),
                input.description.as_str(),
                input.needs_expectations.as_str(),
                input.controls_recommendations.as_str(),
                initial.likelihood(),
                initial.severity(),
                initial.level(),
                residual.likelihood(),
                residual.severity(),
                residual.level(),
                actor.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }

        load_required_party(self.conn, id)
    }

    fn get_party(&self, id: RecordId) -> RepoResult<Option<InterestedParty>> {
        load_party(self.conn, id)
    }

    fn list_parties(&self, view: ArchiveView) -> RepoResult<Vec<InterestedParty>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARTY_SELECT_SQL}
             WHERE {}
             ORDER BY archived ASC, sort_order ASC, id ASC;",
            archive_view_clause(view)
        ))?;
        let mut rows = stmt.query([])?;
        let mut parties = Vec::new();
        while let Some(row) = rows.next()? {
            parties.push(parse_party_row(row)?);
        }
        Ok(parties)
    }

    fn reorder_party(
        &self,
        id: RecordId,
        direction: MoveDirection,
        actor: UserId,
    ) -> RepoResult<ReorderOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let (order, archived): (i64, i64) = tx
            .query_row(
                "SELECT sort_order, archived FROM interested_parties WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| not_found(id))?;
        if archived != 0 {
            return Ok(ReorderOutcome::Unchanged);
        }

        let target = direction.target(order);
        let neighbor: Option<String> = tx
            .query_row(
                "SELECT id
                 FROM interested_parties
                 WHERE archived = 0 AND sort_order = ?1;",
                [target],
                |row| row.get(0),
            )
            .optional()?;
        let Some(neighbor_text) = neighbor else {
            return Ok(ReorderOutcome::Unchanged);
        };
        let neighbor = parse_uuid(&neighbor_text, TABLE, "id")?;

        // Park the moved row outside the active key range while the neighbor
        // takes its slot.
        tx.execute(
            "UPDATE interested_parties SET sort_order = -1 WHERE id = ?1;",
            [id.to_string()],
        )?;
        tx.execute(
            "UPDATE interested_parties SET sort_order = ?2 WHERE id = ?1;",
            params![neighbor_text, order],
        )?;
        tx.execute(
            "UPDATE interested_parties
             SET
                sort_order = ?2,
                updated_by = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), target, actor.to_string()],
        )?;
        tx.commit()?;

        Ok(ReorderOutcome::Moved {
            from: order,
            to: target,
            neighbor,
        })
    }
}

fn load_party(conn: &Connection, id: RecordId) -> RepoResult<Option<InterestedParty>> {
    let mut stmt = conn.prepare(&format!("{PARTY_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_party_row(row)?));
    }
    Ok(None)
}

fn load_required_party(conn: &Connection, id: RecordId) -> RepoResult<InterestedParty> {
    load_party(conn, id)?.ok_or_else(|| not_found(id))
}

fn not_found(id: RecordId) -> RepoError {
    RepoError::NotFound {
        entity: RecordKind::InterestedParty.label(),
        id,
    }
}

fn parse_party_row(row: &Row<'_>) -> RepoResult<InterestedParty> {
    let initial = row_rating(row, TABLE, "initial_likelihood", "initial_severity", "risk_level")?;
    let residual = row_rating(
        row,
        TABLE,
        "residual_likelihood",
        "residual_severity",
        "residual_risk_level",
    )?;

    Ok(InterestedParty {
        id: row_uuid(row, TABLE, "id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        needs_expectations: row.get("needs_expectations")?,
        controls_recommendations: row.get("controls_recommendations")?,
        risk: RiskAssessment::new(initial, residual),
        order: row.get("sort_order")?,
        archived: parse_flag(row, TABLE, "archived")?,
        stamp: row_stamp(row, TABLE)?,
    })
}
