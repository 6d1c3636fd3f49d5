//! Archive/unarchive/delete shared by every register table.
//!
//! # Responsibility
//! - Flip the archive bit and hard-delete rows for any `RecordKind`.
//! - Keep interested-party order keys contiguous across lifecycle changes.
//!
//! # Invariants
//! - Archiving or deleting an ordered record closes the gap it leaves.
//! - An archived ordered record keeps its last order key; unarchiving puts it
//!   back at that key (or at the end, if the active list has shrunk below it).
//! - Archiving an already archived record (and vice versa) changes nothing.

use crate::model::record::{RecordId, RecordKind};
use crate::model::user::UserId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{bool_to_int, ensure_connection_ready, LIFECYCLE_COLUMNS};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Archive-bit transition applied by `set_archived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveChange {
    /// The flag flipped.
    Changed,
    /// The record already had the requested state.
    Unchanged,
}

/// Lifecycle operations independent of a register's columns.
pub trait RecordLifecycleRepository {
    /// Returns `Some(archived)` for an existing record.
    fn archived_state(&self, kind: RecordKind, id: RecordId) -> RepoResult<Option<bool>>;
    /// Sets the archive flag and stamps `updated_by`.
    fn set_archived(
        &self,
        kind: RecordKind,
        id: RecordId,
        archived: bool,
        actor: UserId,
    ) -> RepoResult<ArchiveChange>;
    /// Permanently removes the record (and cascading children).
    fn delete_record(&self, kind: RecordKind, id: RecordId) -> RepoResult<()>;
    /// Counts records of `kind`, optionally only non-archived ones.
    fn count_records(&self, kind: RecordKind, include_archived: bool) -> RepoResult<u64>;
}

/// SQLite-backed lifecycle repository.
pub struct SqliteRecordLifecycleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordLifecycleRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for kind in RecordKind::ALL {
            ensure_connection_ready(conn, kind.table(), LIFECYCLE_COLUMNS)?;
        }
        Ok(Self { conn })
    }
}

impl RecordLifecycleRepository for SqliteRecordLifecycleRepository<'_> {
    fn archived_state(&self, kind: RecordKind, id: RecordId) -> RepoResult<Option<bool>> {
        load_archived(self.conn, kind, id)
    }

    fn set_archived(
        &self,
        kind: RecordKind,
        id: RecordId,
        archived: bool,
        actor: UserId,
    ) -> RepoResult<ArchiveChange> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let current = load_archived(&tx, kind, id)?.ok_or(RepoError::NotFound {
            entity: kind.label(),
            id,
        })?;
        if current == archived {
            return Ok(ArchiveChange::Unchanged);
        }

        if kind.is_ordered() && !archived {
            let previous = load_order(&tx, kind, id)?;
            let slot = previous.min(next_active_order(&tx, kind)?).max(1);
            open_order_slot(&tx, kind, slot)?;
            tx.execute(
                &format!(
                    "UPDATE {}
                     SET archived = 0,
                         sort_order = ?2,
                         updated_by = ?3,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?1;",
                    kind.table()
                ),
                params![id.to_string(), slot, actor.to_string()],
            )?;
        } else {
            let vacated = if kind.is_ordered() {
                Some(load_order(&tx, kind, id)?)
            } else {
                None
            };
            tx.execute(
                &format!(
                    "UPDATE {}
                     SET archived = ?2,
                         updated_by = ?3,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?1;",
                    kind.table()
                ),
                params![id.to_string(), bool_to_int(archived), actor.to_string()],
            )?;
            if let Some(order) = vacated {
                close_order_gap(&tx, kind, order)?;
            }
        }

        tx.commit()?;
        Ok(ArchiveChange::Changed)
    }

    fn delete_record(&self, kind: RecordKind, id: RecordId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let archived = load_archived(&tx, kind, id)?.ok_or(RepoError::NotFound {
            entity: kind.label(),
            id,
        })?;
        let vacated = if kind.is_ordered() && !archived {
            Some(load_order(&tx, kind, id)?)
        } else {
            None
        };

        tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", kind.table()),
            [id.to_string()],
        )?;
        if let Some(order) = vacated {
            close_order_gap(&tx, kind, order)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn count_records(&self, kind: RecordKind, include_archived: bool) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE (?1 = 1 OR archived = 0);",
                kind.table()
            ),
            [bool_to_int(include_archived)],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count for {}", kind.table())))
    }
}

fn load_archived(conn: &Connection, kind: RecordKind, id: RecordId) -> RepoResult<Option<bool>> {
    let value: Option<i64> = conn
        .query_row(
            &format!("SELECT archived FROM {} WHERE id = ?1;", kind.table()),
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(None),
        Some(0) => Ok(Some(false)),
        Some(1) => Ok(Some(true)),
        Some(other) => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {}.archived",
            kind.table()
        ))),
    }
}

fn load_order(conn: &Connection, kind: RecordKind, id: RecordId) -> RepoResult<i64> {
    conn.query_row(
        &format!("SELECT sort_order FROM {} WHERE id = ?1;", kind.table()),
        [id.to_string()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(RepoError::NotFound {
        entity: kind.label(),
        id,
    })
}

/// `max(order of active rows) + 1`, starting at 1.
pub(crate) fn next_active_order(conn: &Connection, kind: RecordKind) -> RepoResult<i64> {
    let next = conn.query_row(
        &format!(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM {} WHERE archived = 0;",
            kind.table()
        ),
        [],
        |row| row.get(0),
    )?;
    Ok(next)
}

/// Shifts active orders at or above `slot` up by one.
///
/// Same two-pass negative-key scheme as `close_order_gap`.
fn open_order_slot(conn: &Connection, kind: RecordKind, slot: i64) -> RepoResult<()> {
    conn.execute(
        &format!(
            "UPDATE {}
             SET sort_order = -(sort_order + 1)
             WHERE archived = 0 AND sort_order >= ?1;",
            kind.table()
        ),
        [slot],
    )?;
    conn.execute(
        &format!(
            "UPDATE {}
             SET sort_order = -sort_order
             WHERE archived = 0 AND sort_order < 0;",
            kind.table()
        ),
        [],
    )?;
    Ok(())
}

/// Shifts active orders above `vacated` down by one.
///
/// Runs in two passes through negative keys so the partial unique index
/// never sees a transient duplicate.
fn close_order_gap(conn: &Connection, kind: RecordKind, vacated: i64) -> RepoResult<()> {
    conn.execute(
        &format!(
            "UPDATE {}
             SET sort_order = -(sort_order - 1)
             WHERE archived = 0 AND sort_order > ?1;",
            kind.table()
        ),
        [vacated],
    )?;
    conn.execute(
        &format!(
            "UPDATE {}
             SET sort_order = -sort_order
             WHERE archived = 0 AND sort_order < 0;",
            kind.table()
        ),
        [],
    )?;
    Ok(())
}
