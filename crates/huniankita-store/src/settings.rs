//! Per-action token cost settings.
//!
//! The costs are read at decision time by the gate so admins can retune the
//! marketplace economics without a deploy.  Rows are seeded by the initial
//! migration (upload = 15, boost = 15).

use rusqlite::params;

use huniankita_shared::ActionKind;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::TokenCosts;

impl Database {
    /// Current cost of one action.
    pub fn action_cost(&self, action: ActionKind) -> Result<i64> {
        self.conn()
            .query_row(
                "SELECT cost FROM token_cost_settings WHERE action = ?1",
                params![action.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Both current costs, for the admin settings endpoint.
    pub fn token_costs(&self) -> Result<TokenCosts> {
        Ok(TokenCosts {
            upload: self.action_cost(ActionKind::Upload)?,
            boost: self.action_cost(ActionKind::Boost)?,
        })
    }

    /// Update the cost of one action.
    ///
    /// The schema CHECK (`cost >= 1`) backs up the gate-level validation.
    pub fn set_action_cost(&self, action: ActionKind, cost: i64) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE token_cost_settings SET cost = ?1 WHERE action = ?2",
            params![cost, action.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::info!(action = %action, cost, "token cost updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_test_db;
    use huniankita_shared::constants::{DEFAULT_BOOST_COST, DEFAULT_UPLOAD_COST};

    #[test]
    fn defaults_are_seeded() {
        let (db, _dir) = open_test_db();
        let costs = db.token_costs().unwrap();
        assert_eq!(costs.upload, DEFAULT_UPLOAD_COST);
        assert_eq!(costs.boost, DEFAULT_BOOST_COST);
    }

    #[test]
    fn costs_are_tunable() {
        let (db, _dir) = open_test_db();
        db.set_action_cost(ActionKind::Upload, 25).unwrap();
        assert_eq!(db.action_cost(ActionKind::Upload).unwrap(), 25);
        // The other action is untouched.
        assert_eq!(db.action_cost(ActionKind::Boost).unwrap(), 15);
    }

    #[test]
    fn schema_rejects_zero_cost() {
        let (db, _dir) = open_test_db();
        // The CHECK constraint is the storage-level backstop; the gate
        // validates first and returns InvalidAmount.
        assert!(db.set_action_cost(ActionKind::Boost, 0).is_err());
        assert_eq!(db.action_cost(ActionKind::Boost).unwrap(), 15);
    }
}
