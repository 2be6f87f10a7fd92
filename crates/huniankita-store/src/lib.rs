//! # huniankita-store
//!
//! Relational persistence for the HunianKita marketplace, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model, plus the atomic token-ledger primitives the upload/boost gate is
//! built on.  All balance mutations go through a conditional SQL update and
//! append to an immutable transaction log inside the same database
//! transaction.

pub mod content;
pub mod database;
pub mod images;
pub mod migrations;
pub mod models;
pub mod properties;
pub mod settings;
pub mod tokens;
pub mod users;

mod error;

#[cfg(test)]
pub(crate) mod test_support;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use properties::{PropertyFilter, PropertySort};
