//! CRUD operations for [`PropertyImage`] metadata rows.
//!
//! The image bytes themselves live on disk under the server's image store;
//! this table only tracks which files belong to which listing.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::PropertyImage;
use crate::users::parse_ts;

impl Database {
    /// Insert an image metadata row.
    pub fn create_property_image(&self, image: &PropertyImage) -> Result<()> {
        self.conn().execute(
            "INSERT INTO property_images (id, property_id, file_name, file_size, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                image.id.to_string(),
                image.property_id.to_string(),
                image.file_name,
                image.file_size,
                image.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single image row by UUID.
    pub fn get_property_image(&self, id: Uuid) -> Result<PropertyImage> {
        self.conn()
            .query_row(
                "SELECT id, property_id, file_name, file_size, created_at
                 FROM property_images WHERE id = ?1",
                params![id.to_string()],
                row_to_image,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all images for a listing, oldest first (upload order).
    pub fn list_property_images(&self, property_id: Uuid) -> Result<Vec<PropertyImage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, property_id, file_name, file_size, created_at
             FROM property_images
             WHERE property_id = ?1
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![property_id.to_string()], row_to_image)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// List every image row across all of one owner's listings.  Used to
    /// clean files off disk before an account delete cascades the rows.
    pub fn list_images_for_owner(&self, owner_id: Uuid) -> Result<Vec<PropertyImage>> {
        let mut stmt = self.conn().prepare(
            "SELECT i.id, i.property_id, i.file_name, i.file_size, i.created_at
             FROM property_images i
             JOIN properties p ON p.id = i.property_id
             WHERE p.owner_id = ?1",
        )?;

        let rows = stmt.query_map(params![owner_id.to_string()], row_to_image)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Delete an image row by UUID.  Returns `true` if a row was deleted.
    pub fn delete_property_image(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM property_images WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<PropertyImage> {
    let id_str: String = row.get(0)?;
    let property_str: String = row.get(1)?;
    let file_name: String = row.get(2)?;
    let file_size: i64 = row.get(3)?;
    let created_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let property_id = Uuid::parse_str(&property_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at = parse_ts(&created_str, 4)?;

    Ok(PropertyImage {
        id,
        property_id,
        file_name,
        file_size,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mitra_user, open_test_db, sample_property};
    use chrono::Utc;

    fn image_for(property_id: Uuid, name: &str) -> PropertyImage {
        PropertyImage {
            id: Uuid::new_v4(),
            property_id,
            file_name: name.to_string(),
            file_size: 2048,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn images_follow_their_property() {
        let (db, _dir) = open_test_db();
        let owner = mitra_user("photos@example.com", 0);
        db.create_user(&owner).unwrap();
        let property = sample_property(owner.id, "Kost Foto", "Depok");
        db.create_property(&property).unwrap();

        let front = image_for(property.id, "front.jpg");
        let room = image_for(property.id, "room.jpg");
        db.create_property_image(&front).unwrap();
        db.create_property_image(&room).unwrap();

        assert_eq!(db.list_property_images(property.id).unwrap().len(), 2);

        // Deleting the listing cascades the image rows.
        db.delete_property(property.id).unwrap();
        assert!(db.list_property_images(property.id).unwrap().is_empty());
        assert!(matches!(
            db.get_property_image(front.id),
            Err(StoreError::NotFound)
        ));
    }
}
