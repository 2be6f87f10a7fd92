//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `users`, `properties`, `property_images`,
//! `token_cost_settings`, `token_transactions`, and `site_content`, and
//! seeds the default per-action token costs.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,              -- Argon2id PHC string
    whatsapp      TEXT,                       -- contact number, rendered by clients
    role          TEXT NOT NULL CHECK (role IN ('guest', 'mitra', 'admin')),
    token_balance INTEGER NOT NULL DEFAULT 0 CHECK (token_balance >= 0),
    created_at    TEXT NOT NULL,              -- ISO-8601 / RFC-3339
    updated_at    TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Properties (listings)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS properties (
    id               TEXT PRIMARY KEY NOT NULL, -- UUID v4
    owner_id         TEXT NOT NULL,             -- FK -> users(id)
    title            TEXT NOT NULL,
    description      TEXT,
    kind             TEXT NOT NULL CHECK (kind IN ('kost', 'guesthouse', 'villa')),
    city             TEXT NOT NULL,
    address          TEXT,
    price            INTEGER NOT NULL,
    price_unit       TEXT NOT NULL CHECK (price_unit IN ('monthly', 'yearly', 'daily')),
    status           TEXT NOT NULL CHECK (status IN ('available', 'pending', 'sold')),
    facilities       TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    is_boosted       INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    boost_expires_at TEXT,
    is_featured      INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_properties_owner ON properties(owner_id);
CREATE INDEX IF NOT EXISTS idx_properties_city_kind ON properties(city, kind);

-- ----------------------------------------------------------------
-- Property images (bytes live on disk, keyed by id)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS property_images (
    id          TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    property_id TEXT NOT NULL,               -- FK -> properties(id)
    file_name   TEXT NOT NULL,
    file_size   INTEGER NOT NULL,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (property_id) REFERENCES properties(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_property_images_property
    ON property_images(property_id);

-- ----------------------------------------------------------------
-- Per-action token costs (admin-tunable)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS token_cost_settings (
    action TEXT PRIMARY KEY NOT NULL CHECK (action IN ('upload', 'boost')),
    cost   INTEGER NOT NULL CHECK (cost >= 1)
);

INSERT OR IGNORE INTO token_cost_settings (action, cost) VALUES ('upload', 15);
INSERT OR IGNORE INTO token_cost_settings (action, cost) VALUES ('boost', 15);

-- ----------------------------------------------------------------
-- Token ledger (append-only; every balance change lands here)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS token_transactions (
    id         TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    user_id    TEXT NOT NULL,                -- FK -> users(id)
    delta      INTEGER NOT NULL,             -- positive grant / negative debit
    reason     TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_token_transactions_user_ts
    ON token_transactions(user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Site content (footer text, landing copy, pricing copy)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS site_content (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
