//! Token ledger primitives.
//!
//! The balance column on `users` is never written from an application-computed
//! value.  Debits go through a single conditional `UPDATE ... WHERE
//! token_balance >= :amount`; a zero affected-row count is the deterministic
//! "insufficient funds" outcome, even under concurrent settles.  Every
//! mutation appends one row to the append-only `token_transactions` ledger in
//! the same SQL transaction, so the running sum of deltas always equals the
//! stored balance.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::TokenTransaction;
use crate::users::parse_ts;

impl Database {
    /// Read a user's current balance.
    pub fn token_balance(&self, user_id: Uuid) -> Result<i64> {
        self.conn()
            .query_row(
                "SELECT token_balance FROM users WHERE id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Atomically deduct `amount` tokens from a user, appending a ledger row.
    ///
    /// Returns the new balance.  Fails with
    /// [`StoreError::InsufficientBalance`] when the live balance does not
    /// cover the amount -- nothing is written in that case.
    pub fn debit_tokens(&mut self, user_id: Uuid, amount: i64, reason: &str) -> Result<i64> {
        debug_assert!(amount > 0, "debit amount must be positive");

        let now = Utc::now().to_rfc3339();
        let tx = self.conn_mut().transaction()?;

        let affected = tx.execute(
            "UPDATE users
             SET token_balance = token_balance - ?1, updated_at = ?2
             WHERE id = ?3 AND token_balance >= ?1",
            params![amount, now, user_id.to_string()],
        )?;
        if affected == 0 {
            // Transaction dropped here -> rollback.
            return Err(StoreError::InsufficientBalance);
        }

        append_ledger_row(&tx, user_id, -amount, reason, &now)?;

        let balance: i64 = tx.query_row(
            "SELECT token_balance FROM users WHERE id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;

        tx.commit()?;

        tracing::debug!(user = %user_id, amount, reason, balance, "tokens debited");
        Ok(balance)
    }

    /// Atomically add `amount` tokens to a user, appending a ledger row.
    ///
    /// Returns the new balance.
    pub fn credit_tokens(&mut self, user_id: Uuid, amount: i64, reason: &str) -> Result<i64> {
        debug_assert!(amount > 0, "credit amount must be positive");

        let now = Utc::now().to_rfc3339();
        let tx = self.conn_mut().transaction()?;

        let affected = tx.execute(
            "UPDATE users
             SET token_balance = token_balance + ?1, updated_at = ?2
             WHERE id = ?3",
            params![amount, now, user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        append_ledger_row(&tx, user_id, amount, reason, &now)?;

        let balance: i64 = tx.query_row(
            "SELECT token_balance FROM users WHERE id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;

        tx.commit()?;

        tracing::info!(user = %user_id, amount, reason, balance, "tokens credited");
        Ok(balance)
    }

    /// Page through a user's ledger, newest first.
    pub fn list_token_transactions(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TokenTransaction>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, delta, reason, created_at
             FROM token_transactions
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(
            params![user_id.to_string(), limit, offset],
            row_to_transaction,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Sum of all ledger deltas for a user.  Diagnostic: must equal the
    /// stored balance at all times.
    pub fn ledger_sum(&self, user_id: Uuid) -> Result<i64> {
        let sum: i64 = self.conn().query_row(
            "SELECT COALESCE(SUM(delta), 0) FROM token_transactions WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(sum)
    }
}

/// Append one row to the ledger inside an open transaction.
pub(crate) fn append_ledger_row(
    tx: &rusqlite::Transaction<'_>,
    user_id: Uuid,
    delta: i64,
    reason: &str,
    now: &str,
) -> Result<()> {
    tx.execute(
        "INSERT INTO token_transactions (id, user_id, delta, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            delta,
            reason,
            now,
        ],
    )?;
    Ok(())
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<TokenTransaction> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let delta: i64 = row.get(2)?;
    let reason: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let user_id = Uuid::parse_str(&user_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at = parse_ts(&created_str, 4)?;

    Ok(TokenTransaction {
        id,
        user_id,
        delta,
        reason,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mitra_user, open_test_db};

    #[test]
    fn credit_then_debit() {
        let (mut db, _dir) = open_test_db();
        let user = mitra_user("ledger@example.com", 5);
        db.create_user(&user).unwrap();

        let balance = db.credit_tokens(user.id, 30, "admin_grant").unwrap();
        assert_eq!(balance, 35);

        let balance = db.debit_tokens(user.id, 15, "upload").unwrap();
        assert_eq!(balance, 20);
        assert_eq!(db.token_balance(user.id).unwrap(), 20);
    }

    #[test]
    fn debit_below_zero_is_rejected_and_writes_nothing() {
        let (mut db, _dir) = open_test_db();
        let user = mitra_user("poor@example.com", 10);
        db.create_user(&user).unwrap();

        assert!(matches!(
            db.debit_tokens(user.id, 15, "upload"),
            Err(StoreError::InsufficientBalance)
        ));

        // Balance untouched, no ledger row appended.
        assert_eq!(db.token_balance(user.id).unwrap(), 10);
        assert!(db
            .list_token_transactions(user.id, 10, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn exact_balance_drains_to_zero() {
        let (mut db, _dir) = open_test_db();
        let user = mitra_user("exact@example.com", 15);
        db.create_user(&user).unwrap();

        assert_eq!(db.debit_tokens(user.id, 15, "upload").unwrap(), 0);
        assert!(matches!(
            db.debit_tokens(user.id, 15, "upload"),
            Err(StoreError::InsufficientBalance)
        ));
    }

    #[test]
    fn ledger_sum_matches_balance() {
        let (mut db, _dir) = open_test_db();
        let user = mitra_user("audit@example.com", 0);
        db.create_user(&user).unwrap();

        db.credit_tokens(user.id, 75, "admin_grant").unwrap();
        db.debit_tokens(user.id, 15, "upload").unwrap();
        db.debit_tokens(user.id, 15, "boost").unwrap();
        db.credit_tokens(user.id, 30, "admin_grant").unwrap();

        assert_eq!(db.ledger_sum(user.id).unwrap(), 75);
        assert_eq!(db.token_balance(user.id).unwrap(), 75);

        let history = db.list_token_transactions(user.id, 10, 0).unwrap();
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn credit_unknown_user_is_not_found() {
        let (mut db, _dir) = open_test_db();
        assert!(matches!(
            db.credit_tokens(Uuid::new_v4(), 15, "admin_grant"),
            Err(StoreError::NotFound)
        ));
    }
}
