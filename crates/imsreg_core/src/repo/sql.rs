//! Row parsing and schema readiness helpers shared by SQLite repositories.

use crate::db::migrations::latest_version;
use crate::model::record::{ArchiveView, AuditStamp};
use crate::model::risk::RiskRating;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::{Connection, Row};
use uuid::Uuid;

/// Columns every register table carries for lifecycle and attribution.
pub(crate) const LIFECYCLE_COLUMNS: &[&str] = &[
    "id",
    "archived",
    "created_by",
    "updated_by",
    "created_at",
    "updated_at",
];

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// `WHERE`-clause fragment for an archive view.
pub(crate) fn archive_view_clause(view: ArchiveView) -> &'static str {
    match view {
        ArchiveView::Active => "archived = 0",
        ArchiveView::Archived => "archived = 1",
        ArchiveView::All => "1 = 1",
    }
}

pub(crate) fn parse_flag(row: &Row<'_>, table: &str, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {table}.{column}"
        ))),
    }
}

pub(crate) fn parse_uuid(value: &str, table: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid `{value}` in {table}.{column}"))
    })
}

pub(crate) fn row_uuid(row: &Row<'_>, table: &str, column: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(&text, table, column)
}

pub(crate) fn row_optional_uuid(row: &Row<'_>, table: &str, column: &str) -> RepoResult<Option<Uuid>> {
    row.get::<_, Option<String>>(column)?
        .map(|value| parse_uuid(&value, table, column))
        .transpose()
}

pub(crate) fn row_stamp(row: &Row<'_>, table: &str) -> RepoResult<AuditStamp> {
    Ok(AuditStamp {
        created_by: row_uuid(row, table, "created_by")?,
        updated_by: row_optional_uuid(row, table, "updated_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Rebuilds a rating and rejects rows whose stored level disagrees with the
/// stored inputs.
pub(crate) fn row_rating(
    row: &Row<'_>,
    table: &str,
    likelihood_column: &str,
    severity_column: &str,
    level_column: &str,
) -> RepoResult<RiskRating> {
    let likelihood: i64 = row.get(likelihood_column)?;
    let severity: i64 = row.get(severity_column)?;
    let stored_level: i64 = row.get(level_column)?;

    let rating = match (u8::try_from(likelihood), u8::try_from(severity)) {
        (Ok(likelihood), Ok(severity)) => RiskRating::new(likelihood, severity).ok(),
        _ => None,
    }
    .ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid rating `{likelihood}x{severity}` in {table}.{likelihood_column}/{severity_column}"
        ))
    })?;

    if i64::from(rating.level()) != stored_level {
        return Err(RepoError::InvalidData(format!(
            "stale risk level `{stored_level}` in {table}.{level_column}, expected {}",
            rating.level()
        )));
    }
    Ok(rating)
}

/// Verifies schema version, table and columns before a repository is used.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for &column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
