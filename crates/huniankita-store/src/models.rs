//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the API
//! layer as a JSON response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use huniankita_shared::{PriceUnit, PropertyStatus, PropertyType, Role};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account (guest, mitra, or admin).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Login email; unique across the site.
    pub email: String,
    /// Argon2id PHC string.  Never serialized into responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Optional WhatsApp contact number; clients build the deep link.
    pub whatsapp: Option<String>,
    /// Account role.
    pub role: Role,
    /// Token balance.  Invariant: never negative.
    pub token_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Property
// ---------------------------------------------------------------------------

/// A rental listing.  Created only behind the upload gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Property {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning mitra account.
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Kost, guest house, or villa.
    pub kind: PropertyType,
    pub city: String,
    pub address: Option<String>,
    /// Price in rupiah, interpreted per `price_unit`.
    pub price: i64,
    pub price_unit: PriceUnit,
    pub status: PropertyStatus,
    /// Facility tags (wifi, parking, ...).  Stored as a JSON array.
    pub facilities: Vec<String>,
    /// Whether a paid boost is currently flagged on this listing.
    pub is_boosted: bool,
    /// End of the boost window, if one was purchased.
    pub boost_expires_at: Option<DateTime<Utc>>,
    /// Admin-curated landing page pick.
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Whether the boost window is live at `now`.
    pub fn boost_active(&self, now: DateTime<Utc>) -> bool {
        self.is_boosted && self.boost_expires_at.is_some_and(|until| until > now)
    }
}

// ---------------------------------------------------------------------------
// Property image
// ---------------------------------------------------------------------------

/// Metadata for a listing photo.  Bytes live on disk, keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyImage {
    pub id: Uuid,
    pub property_id: Uuid,
    /// Original file name as uploaded.
    pub file_name: String,
    /// File size in bytes.
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Token ledger entry
// ---------------------------------------------------------------------------

/// One append-only ledger row.  The running sum of `delta` per user equals
/// that user's stored balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Positive for grants, negative for debits.
    pub delta: i64,
    /// What moved the balance ("upload", "boost", "admin_grant", ...).
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Token costs
// ---------------------------------------------------------------------------

/// Current per-action costs, read from `token_cost_settings`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenCosts {
    pub upload: i64,
    pub boost: i64,
}

// ---------------------------------------------------------------------------
// Site content
// ---------------------------------------------------------------------------

/// A single CMS-like content entry (footer text, landing copy, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteContent {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
