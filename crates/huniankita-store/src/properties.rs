//! CRUD and query operations for [`Property`] records.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, ToSql};
use uuid::Uuid;

use huniankita_shared::{PriceUnit, PropertyStatus, PropertyType};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Property;
use crate::tokens::append_ledger_row;
use crate::users::parse_ts;

/// Sort order for listing queries.  Actively boosted listings always rank
/// first, then featured ones, then this order applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PropertySort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl PropertySort {
    fn sql(&self) -> &'static str {
        match self {
            PropertySort::Newest => "created_at DESC",
            PropertySort::PriceAsc => "price ASC",
            PropertySort::PriceDesc => "price DESC",
        }
    }
}

/// Composable filter for listing queries.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub kind: Option<PropertyType>,
    /// Case-insensitive exact city match.
    pub city: Option<String>,
    /// Substring search over title and description.
    pub query: Option<String>,
    pub status: Option<PropertyStatus>,
    pub owner_id: Option<Uuid>,
    pub sort: PropertySort,
}

impl PropertyFilter {
    /// Build the WHERE clause and its parameters.
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(kind) = self.kind {
            values.push(Value::from(kind.as_str().to_string()));
            clauses.push(format!("kind = ?{}", values.len()));
        }
        if let Some(ref city) = self.city {
            values.push(Value::from(city.to_lowercase()));
            clauses.push(format!("LOWER(city) = ?{}", values.len()));
        }
        if let Some(ref query) = self.query {
            values.push(Value::from(format!("%{}%", query.to_lowercase())));
            let n = values.len();
            clauses.push(format!(
                "(LOWER(title) LIKE ?{n} OR LOWER(COALESCE(description, '')) LIKE ?{n})"
            ));
        }
        if let Some(status) = self.status {
            values.push(Value::from(status.as_str().to_string()));
            clauses.push(format!("status = ?{}", values.len()));
        }
        if let Some(owner_id) = self.owner_id {
            values.push(Value::from(owner_id.to_string()));
            clauses.push(format!("owner_id = ?{}", values.len()));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

const PROPERTY_COLUMNS: &str = "id, owner_id, title, description, kind, city, address, price, \
     price_unit, status, facilities, is_boosted, boost_expires_at, is_featured, \
     created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new property without touching the token ledger (admin seeds,
    /// tests).  Gated creation goes through [`Database::create_property_paid`].
    pub fn create_property(&self, property: &Property) -> Result<()> {
        self.conn()
            .execute(&insert_sql(), params_from_iter(insert_params(property)))?;
        Ok(())
    }

    /// Insert a new property *and* settle its upload cost in one SQL
    /// transaction: the listing row, the conditional balance decrement, and
    /// the ledger append commit together or not at all.
    ///
    /// Fails with [`StoreError::InsufficientBalance`] (nothing written) when
    /// the owner's live balance does not cover `cost`.
    pub fn create_property_paid(&mut self, property: &Property, cost: i64) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let owner_id = property.owner_id;

        let tx = self.conn_mut().transaction()?;

        tx.execute(&insert_sql(), params_from_iter(insert_params(property)))?;

        let affected = tx.execute(
            "UPDATE users
             SET token_balance = token_balance - ?1, updated_at = ?2
             WHERE id = ?3 AND token_balance >= ?1",
            params![cost, now, owner_id.to_string()],
        )?;
        if affected == 0 {
            // Rolls back the listing insert as well.
            return Err(StoreError::InsufficientBalance);
        }

        append_ledger_row(&tx, owner_id, -cost, "upload", &now)?;

        let balance: i64 = tx.query_row(
            "SELECT token_balance FROM users WHERE id = ?1",
            params![owner_id.to_string()],
            |row| row.get(0),
        )?;

        tx.commit()?;

        tracing::info!(
            property = %property.id,
            owner = %owner_id,
            cost,
            balance,
            "listing created and settled"
        );
        Ok(balance)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single property by UUID.
    pub fn get_property(&self, id: Uuid) -> Result<Property> {
        self.conn()
            .query_row(
                &format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = ?1"),
                params![id.to_string()],
                row_to_property,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List properties matching `filter`.
    ///
    /// Actively boosted listings (unexpired window) come first, then
    /// featured ones, then the filter's sort order.
    pub fn list_properties(
        &self,
        filter: &PropertyFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Property>> {
        let (where_sql, mut values) = filter.where_clause();

        values.push(Value::from(Utc::now().to_rfc3339()));
        let now_idx = values.len();
        values.push(Value::from(i64::from(limit)));
        let limit_idx = values.len();
        values.push(Value::from(i64::from(offset)));
        let offset_idx = values.len();

        let sql = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties
             {where_sql}
             ORDER BY
                 (CASE WHEN is_boosted = 1 AND boost_expires_at > ?{now_idx}
                       THEN 0 ELSE 1 END),
                 is_featured DESC,
                 {sort}
             LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
            sort = filter.sort.sql(),
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_property)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Total number of properties matching `filter` (for pagination).
    pub fn count_properties(&self, filter: &PropertyFilter) -> Result<u64> {
        let (where_sql, values) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM properties {where_sql}");

        let count: i64 = self
            .conn()
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update the editable listing fields.
    pub fn update_property(&self, property: &Property) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE properties
             SET title = ?1, description = ?2, kind = ?3, city = ?4, address = ?5,
                 price = ?6, price_unit = ?7, status = ?8, facilities = ?9,
                 updated_at = ?10
             WHERE id = ?11",
            params![
                property.title,
                property.description,
                property.kind.as_str(),
                property.city,
                property.address,
                property.price,
                property.price_unit.as_str(),
                property.status.as_str(),
                facilities_json(&property.facilities),
                Utc::now().to_rfc3339(),
                property.id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Flag a listing as boosted until `until`.
    pub fn set_property_boost(&self, id: Uuid, until: DateTime<Utc>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE properties
             SET is_boosted = 1, boost_expires_at = ?1, updated_at = ?2
             WHERE id = ?3",
            params![
                until.to_rfc3339(),
                Utc::now().to_rfc3339(),
                id.to_string()
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Flag or unflag a listing as an admin landing-page pick.
    pub fn set_property_featured(&self, id: Uuid, featured: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE properties SET is_featured = ?1, updated_at = ?2 WHERE id = ?3",
            params![featured, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Clear boost flags whose window has passed.  Returns how many listings
    /// were swept.  Run periodically by the server.
    pub fn expire_boosts(&self, now: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE properties
             SET is_boosted = 0
             WHERE is_boosted = 1 AND boost_expires_at <= ?1",
            params![now.to_rfc3339()],
        )?;
        Ok(affected)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a property by UUID.  Returns `true` if a row was deleted.
    ///
    /// ON DELETE CASCADE: image rows go with it.  Callers are responsible
    /// for removing the image files from disk (fetch the rows first).
    pub fn delete_property(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM properties WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_sql() -> String {
    format!(
        "INSERT INTO properties ({PROPERTY_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
    )
}

fn insert_params(p: &Property) -> Vec<Box<dyn ToSql>> {
    vec![
        Box::new(p.id.to_string()),
        Box::new(p.owner_id.to_string()),
        Box::new(p.title.clone()),
        Box::new(p.description.clone()),
        Box::new(p.kind.as_str()),
        Box::new(p.city.clone()),
        Box::new(p.address.clone()),
        Box::new(p.price),
        Box::new(p.price_unit.as_str()),
        Box::new(p.status.as_str()),
        Box::new(facilities_json(&p.facilities)),
        Box::new(p.is_boosted),
        Box::new(p.boost_expires_at.map(|t| t.to_rfc3339())),
        Box::new(p.is_featured),
        Box::new(p.created_at.to_rfc3339()),
        Box::new(p.updated_at.to_rfc3339()),
    ]
}

fn facilities_json(facilities: &[String]) -> String {
    serde_json::to_string(facilities).unwrap_or_else(|_| "[]".to_string())
}

/// Map a `rusqlite::Row` to a [`Property`].
fn row_to_property(row: &rusqlite::Row<'_>) -> rusqlite::Result<Property> {
    let id_str: String = row.get(0)?;
    let owner_str: String = row.get(1)?;
    let title: String = row.get(2)?;
    let description: Option<String> = row.get(3)?;
    let kind_str: String = row.get(4)?;
    let city: String = row.get(5)?;
    let address: Option<String> = row.get(6)?;
    let price: i64 = row.get(7)?;
    let unit_str: String = row.get(8)?;
    let status_str: String = row.get(9)?;
    let facilities_str: String = row.get(10)?;
    let is_boosted: bool = row.get(11)?;
    let boost_str: Option<String> = row.get(12)?;
    let is_featured: bool = row.get(13)?;
    let created_str: String = row.get(14)?;
    let updated_str: String = row.get(15)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let owner_id = Uuid::parse_str(&owner_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let kind: PropertyType = kind_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let price_unit: PriceUnit = unit_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status: PropertyStatus = status_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    // Legacy rows may hold malformed JSON here; degrade to the empty list.
    let facilities: Vec<String> = serde_json::from_str(&facilities_str).unwrap_or_default();

    let boost_expires_at = match boost_str {
        Some(s) => Some(parse_ts(&s, 12)?),
        None => None,
    };
    let created_at = parse_ts(&created_str, 14)?;
    let updated_at = parse_ts(&updated_str, 15)?;

    Ok(Property {
        id,
        owner_id,
        title,
        description,
        kind,
        city,
        address,
        price,
        price_unit,
        status,
        facilities,
        is_boosted,
        boost_expires_at,
        is_featured,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mitra_user, open_test_db, sample_property};
    use chrono::Duration;

    #[test]
    fn create_and_fetch_round_trip() {
        let (db, _dir) = open_test_db();
        let owner = mitra_user("owner@example.com", 0);
        db.create_user(&owner).unwrap();

        let property = sample_property(owner.id, "Kost Melati", "Bandung");
        db.create_property(&property).unwrap();

        let fetched = db.get_property(property.id).unwrap();
        assert_eq!(fetched, property);
        assert_eq!(fetched.facilities, vec!["wifi", "parking"]);
    }

    #[test]
    fn paid_create_settles_in_one_transaction() {
        let (mut db, _dir) = open_test_db();
        let owner = mitra_user("paid@example.com", 15);
        db.create_user(&owner).unwrap();

        let property = sample_property(owner.id, "Kost Anggrek", "Jakarta");
        let balance = db.create_property_paid(&property, 15).unwrap();
        assert_eq!(balance, 0);

        assert!(db.get_property(property.id).is_ok());
        assert_eq!(db.ledger_sum(owner.id).unwrap(), -15);
    }

    #[test]
    fn paid_create_rolls_back_when_short() {
        let (mut db, _dir) = open_test_db();
        let owner = mitra_user("short@example.com", 10);
        db.create_user(&owner).unwrap();

        let property = sample_property(owner.id, "Kost Gagal", "Jakarta");
        assert!(matches!(
            db.create_property_paid(&property, 15),
            Err(StoreError::InsufficientBalance)
        ));

        // The listing insert rolled back with the failed debit.
        assert!(matches!(
            db.get_property(property.id),
            Err(StoreError::NotFound)
        ));
        assert_eq!(db.token_balance(owner.id).unwrap(), 10);
        assert!(db
            .list_token_transactions(owner.id, 10, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn filters_compose() {
        let (db, _dir) = open_test_db();
        let owner = mitra_user("filters@example.com", 0);
        db.create_user(&owner).unwrap();

        let mut kost = sample_property(owner.id, "Kost Mawar", "Bandung");
        kost.kind = PropertyType::Kost;
        let mut villa = sample_property(owner.id, "Villa Puncak", "Bogor");
        villa.kind = PropertyType::Villa;
        db.create_property(&kost).unwrap();
        db.create_property(&villa).unwrap();

        let filter = PropertyFilter {
            kind: Some(PropertyType::Villa),
            ..Default::default()
        };
        let hits = db.list_properties(&filter, 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, villa.id);

        let filter = PropertyFilter {
            kind: Some(PropertyType::Kost),
            city: Some("bandung".to_string()),
            query: Some("mawar".to_string()),
            ..Default::default()
        };
        assert_eq!(db.count_properties(&filter).unwrap(), 1);

        let filter = PropertyFilter {
            city: Some("Surabaya".to_string()),
            ..Default::default()
        };
        assert!(db.list_properties(&filter, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn boosted_listings_rank_first() {
        let (db, _dir) = open_test_db();
        let owner = mitra_user("boost@example.com", 0);
        db.create_user(&owner).unwrap();

        let plain = sample_property(owner.id, "Kost Biasa", "Malang");
        let boosted = sample_property(owner.id, "Kost Promo", "Malang");
        db.create_property(&plain).unwrap();
        db.create_property(&boosted).unwrap();

        db.set_property_boost(boosted.id, Utc::now() + Duration::days(7))
            .unwrap();

        let hits = db
            .list_properties(&PropertyFilter::default(), 10, 0)
            .unwrap();
        assert_eq!(hits[0].id, boosted.id);

        // An expired boost stops counting.
        db.set_property_boost(boosted.id, Utc::now() - Duration::hours(1))
            .unwrap();
        let swept = db.expire_boosts(Utc::now()).unwrap();
        assert_eq!(swept, 1);
        assert!(!db.get_property(boosted.id).unwrap().is_boosted);
    }

    #[test]
    fn update_and_delete() {
        let (db, _dir) = open_test_db();
        let owner = mitra_user("edit@example.com", 0);
        db.create_user(&owner).unwrap();

        let mut property = sample_property(owner.id, "Kost Lama", "Solo");
        db.create_property(&property).unwrap();

        property.title = "Kost Baru".to_string();
        property.status = PropertyStatus::Pending;
        property.facilities.push("laundry".to_string());
        db.update_property(&property).unwrap();

        let fetched = db.get_property(property.id).unwrap();
        assert_eq!(fetched.title, "Kost Baru");
        assert_eq!(fetched.status, PropertyStatus::Pending);
        assert!(fetched.facilities.contains(&"laundry".to_string()));

        assert!(db.delete_property(property.id).unwrap());
        assert!(!db.delete_property(property.id).unwrap());
    }
}
