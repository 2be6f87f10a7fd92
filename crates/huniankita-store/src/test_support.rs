//! Fixtures shared by the store tests.

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use huniankita_shared::{PriceUnit, PropertyStatus, PropertyType, Role};

use crate::database::Database;
use crate::models::{Property, User};

pub(crate) fn open_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    (db, dir)
}

pub(crate) fn mitra_user(email: &str, balance: i64) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: "Test Mitra".to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$test".to_string(),
        whatsapp: Some("+628123456789".to_string()),
        role: Role::Mitra,
        token_balance: balance,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn sample_property(owner_id: Uuid, title: &str, city: &str) -> Property {
    let now = Utc::now();
    Property {
        id: Uuid::new_v4(),
        owner_id,
        title: title.to_string(),
        description: Some("Kamar nyaman dekat kampus".to_string()),
        kind: PropertyType::Kost,
        city: city.to_string(),
        address: Some("Jl. Mawar 12".to_string()),
        price: 1_500_000,
        price_unit: PriceUnit::Monthly,
        status: PropertyStatus::Available,
        facilities: vec!["wifi".to_string(), "parking".to_string()],
        is_boosted: false,
        boost_expires_at: None,
        is_featured: false,
        created_at: now,
        updated_at: now,
    }
}
