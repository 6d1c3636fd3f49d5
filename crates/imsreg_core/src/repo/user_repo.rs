//! Local mirror of users resolved by the external auth collaborator.
//!
//! Register rows reference `users(id)` for attribution and ownership, so a
//! user must be mirrored before its first write.

use crate::model::user::{User, UserId};
use crate::repo::error::RepoResult;
use crate::repo::sql::{bool_to_int, ensure_connection_ready, parse_flag, row_uuid};
use rusqlite::{params, Connection, Row};

const TABLE: &str = "users";

const USER_SELECT_SQL: &str = "SELECT id, name, email, active FROM users";

pub trait UserRepository {
    /// Inserts or refreshes name/email/active for one user.
    fn upsert_user(&self, user: &User) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Active users ordered by name, for owner/auditor pickers.
    fn list_active_users(&self) -> RepoResult<Vec<User>>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TABLE, &["id", "name", "email", "active"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn upsert_user(&self, user: &User) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, active)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                active = excluded.active,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE users.name <> excluded.name
                OR users.email <> excluded.email
                OR users.active <> excluded.active;",
            params![
                user.id.to_string(),
                user.name.as_str(),
                user.email.as_str(),
                bool_to_int(user.active),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn list_active_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL} WHERE active = 1 ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row_uuid(row, TABLE, "id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        active: parse_flag(row, TABLE, "active")?,
    })
}
