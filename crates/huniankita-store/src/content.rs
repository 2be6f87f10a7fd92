//! Site content key/value store (footer text, landing copy, pricing copy).

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::SiteContent;
use crate::users::parse_ts;

impl Database {
    /// Fetch one content entry by key.
    pub fn get_content(&self, key: &str) -> Result<SiteContent> {
        self.conn()
            .query_row(
                "SELECT key, value, updated_at FROM site_content WHERE key = ?1",
                params![key],
                row_to_content,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Insert or overwrite a content entry.
    pub fn set_content(&self, key: &str, value: &str) -> Result<SiteContent> {
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO site_content (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, now.to_rfc3339()],
        )?;
        Ok(SiteContent {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: now,
        })
    }

    /// List every content entry, for the admin dashboard.
    pub fn list_content(&self) -> Result<Vec<SiteContent>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT key, value, updated_at FROM site_content ORDER BY key ASC")?;
        let rows = stmt.query_map([], row_to_content)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_content(row: &rusqlite::Row<'_>) -> rusqlite::Result<SiteContent> {
    let key: String = row.get(0)?;
    let value: String = row.get(1)?;
    let updated_str: String = row.get(2)?;
    let updated_at = parse_ts(&updated_str, 2)?;

    Ok(SiteContent {
        key,
        value,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_test_db;

    #[test]
    fn upsert_round_trip() {
        let (db, _dir) = open_test_db();

        db.set_content("footer", "Hubungi kami di WA").unwrap();
        assert_eq!(db.get_content("footer").unwrap().value, "Hubungi kami di WA");

        db.set_content("footer", "Alamat baru").unwrap();
        assert_eq!(db.get_content("footer").unwrap().value, "Alamat baru");

        assert_eq!(db.list_content().unwrap().len(), 1);
    }

    #[test]
    fn missing_key_is_not_found() {
        let (db, _dir) = open_test_db();
        assert!(matches!(
            db.get_content("landing"),
            Err(StoreError::NotFound)
        ));
    }
}
