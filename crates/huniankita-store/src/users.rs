//! CRUD operations for [`User`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use huniankita_shared::Role;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user.  Fails with [`StoreError::AlreadyExists`] when the
    /// email is taken.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users
                 (id, name, email, password_hash, whatsapp, role, token_balance,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password_hash,
                user.whatsapp,
                user.role.as_str(),
                user.token_balance,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::AlreadyExists)
            }
            Err(other) => Err(StoreError::Sqlite(other)),
        }
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a single user by login email.
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List users, newest first.
    pub fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             ORDER BY created_at DESC
             LIMIT ?1 OFFSET ?2"
        ))?;

        let rows = stmt.query_map(params![limit, offset], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Whether any admin account exists (used for the bootstrap seed).
    pub fn has_admin(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update a user's profile fields (name, whatsapp).
    pub fn update_user_profile(
        &self,
        id: Uuid,
        name: &str,
        whatsapp: Option<&str>,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET name = ?1, whatsapp = ?2, updated_at = ?3 WHERE id = ?4",
            params![name, whatsapp, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a user by UUID.  Returns `true` if a row was deleted.
    ///
    /// ON DELETE CASCADE: their properties, image rows, and ledger entries
    /// go with them.
    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const USER_COLUMNS: &str =
    "id, name, email, password_hash, whatsapp, role, token_balance, created_at, updated_at";

/// Map a `rusqlite::Row` to a [`User`].
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let email: String = row.get(2)?;
    let password_hash: String = row.get(3)?;
    let whatsapp: Option<String> = row.get(4)?;
    let role_str: String = row.get(5)?;
    let token_balance: i64 = row.get(6)?;
    let created_str: String = row.get(7)?;
    let updated_str: String = row.get(8)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let role: Role = role_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at = parse_ts(&created_str, 7)?;
    let updated_at = parse_ts(&updated_str, 8)?;

    Ok(User {
        id,
        name,
        email,
        password_hash,
        whatsapp,
        role,
        token_balance,
        created_at,
        updated_at,
    })
}

/// Parse an RFC-3339 column, reporting the column index on failure.
pub(crate) fn parse_ts(value: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mitra_user, open_test_db};

    #[test]
    fn create_and_fetch() {
        let (db, _dir) = open_test_db();
        let user = mitra_user("ani@example.com", 15);
        db.create_user(&user).unwrap();

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched, user);

        let by_email = db.get_user_by_email("ani@example.com").unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[test]
    fn duplicate_email_rejected() {
        let (db, _dir) = open_test_db();
        let a = mitra_user("dup@example.com", 0);
        let mut b = mitra_user("dup@example.com", 0);
        b.id = Uuid::new_v4();

        db.create_user(&a).unwrap();
        assert!(matches!(
            db.create_user(&b),
            Err(StoreError::AlreadyExists)
        ));
    }

    #[test]
    fn missing_user_is_not_found() {
        let (db, _dir) = open_test_db();
        assert!(matches!(
            db.get_user(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn delete_cascades_nothing_left() {
        let (db, _dir) = open_test_db();
        let user = mitra_user("bye@example.com", 0);
        db.create_user(&user).unwrap();

        assert!(db.delete_user(user.id).unwrap());
        assert!(!db.delete_user(user.id).unwrap());
    }

    #[test]
    fn has_admin_reflects_roles() {
        let (db, _dir) = open_test_db();
        assert!(!db.has_admin().unwrap());

        let mut admin = mitra_user("root@example.com", 0);
        admin.role = huniankita_shared::Role::Admin;
        db.create_user(&admin).unwrap();
        assert!(db.has_admin().unwrap());
    }
}
