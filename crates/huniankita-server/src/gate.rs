//! Token ledger gate.
//!
//! Every paid partner action (listing upload, boost) passes through this
//! gate: a read-only [`TokenGate::authorize`] check against the live balance
//! and the admin-tunable cost table, then a [`TokenGate::settle`] that
//! performs the storage-level conditional decrement.  The decrement is the
//! correctness mechanism -- two racing settles for the same user resolve
//! deterministically, with the loser seeing zero affected rows instead of a
//! negative balance.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use huniankita_shared::{ActionKind, Decision, DenyReason, Role};
use huniankita_store::{Database, StoreError};

/// Errors produced by gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// Balance below cost at settle time (authorize reports this as a
    /// [`Decision::Denied`] instead).
    #[error("Insufficient tokens: {shortfall} more needed")]
    InsufficientTokens { shortfall: i64 },

    /// Caller lacks the role the operation requires.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Grant or cost value out of range.
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// The balance moved between authorize and settle in a way that would
    /// drive it negative.  Surfaced as "please retry".
    #[error("Token balance changed concurrently")]
    ConcurrentModification,

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Authorizes and settles paid actions against the shared database handle.
#[derive(Clone)]
pub struct TokenGate {
    db: Arc<Mutex<Database>>,
}

impl TokenGate {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Decide whether `user_id` may perform `action` right now.
    ///
    /// Read-only: re-reads the user row and the live cost on every call --
    /// cached or client-supplied balances are never trusted.
    pub async fn authorize(&self, user_id: Uuid, action: ActionKind) -> Result<Decision, GateError> {
        let db = self.db.lock().await;

        let user = db.get_user(user_id)?;
        if user.role != Role::Mitra {
            return Err(GateError::Forbidden(
                "Only mitra accounts can perform paid actions".into(),
            ));
        }

        let cost = db.action_cost(action)?;
        if user.token_balance < cost {
            let shortfall = cost - user.token_balance;
            info!(user = %user_id, action = %action, cost, shortfall, "gate denied");
            return Ok(Decision::Denied {
                reason: DenyReason::InsufficientTokens,
                shortfall,
            });
        }

        Ok(Decision::Approved { cost })
    }

    /// Deduct `approved_cost` from `user_id` after the guarded action
    /// durably succeeded.  Returns the new balance.
    ///
    /// The decrement is conditional at the SQL layer; if the balance no
    /// longer covers the cost, nothing is written and
    /// [`GateError::ConcurrentModification`] is returned.
    pub async fn settle(
        &self,
        user_id: Uuid,
        action: ActionKind,
        approved_cost: i64,
    ) -> Result<i64, GateError> {
        let mut db = self.db.lock().await;

        match db.debit_tokens(user_id, approved_cost, action.as_str()) {
            Ok(balance) => Ok(balance),
            Err(StoreError::InsufficientBalance) => {
                warn!(
                    user = %user_id,
                    action = %action,
                    cost = approved_cost,
                    "settle lost its race, balance no longer covers cost"
                );
                Err(GateError::ConcurrentModification)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Admin top-up.  Returns the target's new balance.
    pub async fn grant(
        &self,
        admin_id: Uuid,
        target_user_id: Uuid,
        amount: i64,
    ) -> Result<i64, GateError> {
        if amount <= 0 {
            return Err(GateError::InvalidAmount(amount));
        }

        let mut db = self.db.lock().await;
        self.require_admin(&db, admin_id)?;

        let balance = db.credit_tokens(target_user_id, amount, "admin_grant")?;
        info!(admin = %admin_id, user = %target_user_id, amount, balance, "tokens granted");
        Ok(balance)
    }

    /// Admin retune of a per-action cost.
    pub async fn set_cost(
        &self,
        admin_id: Uuid,
        action: ActionKind,
        new_cost: i64,
    ) -> Result<(), GateError> {
        if new_cost < 1 {
            return Err(GateError::InvalidAmount(new_cost));
        }

        let db = self.db.lock().await;
        self.require_admin(&db, admin_id)?;

        db.set_action_cost(action, new_cost)?;
        Ok(())
    }

    /// Role is re-read from storage, not taken from the caller's token.
    fn require_admin(&self, db: &Database, user_id: Uuid) -> Result<(), GateError> {
        let user = db.get_user(user_id)?;
        if user.role != Role::Admin {
            return Err(GateError::Forbidden("Admin role required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use huniankita_store::User;

    fn seed_user(db: &Database, role: Role, balance: i64) -> Uuid {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Gate Test".to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "$argon2id$test".to_string(),
            whatsapp: None,
            role,
            token_balance: balance,
            created_at: now,
            updated_at: now,
        };
        db.create_user(&user).unwrap();
        user.id
    }

    async fn test_gate(seed: impl FnOnce(&Database) -> Uuid) -> (TokenGate, Uuid, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("gate.db")).unwrap();
        let user_id = seed(&db);
        let gate = TokenGate::new(Arc::new(Mutex::new(db)));
        (gate, user_id, dir)
    }

    #[tokio::test]
    async fn exact_balance_approves_then_denies() {
        let (gate, user, _dir) = test_gate(|db| seed_user(db, Role::Mitra, 15)).await;

        let decision = gate.authorize(user, ActionKind::Upload).await.unwrap();
        assert_eq!(decision, Decision::Approved { cost: 15 });

        let balance = gate.settle(user, ActionKind::Upload, 15).await.unwrap();
        assert_eq!(balance, 0);

        let decision = gate.authorize(user, ActionKind::Upload).await.unwrap();
        assert_eq!(
            decision,
            Decision::Denied {
                reason: DenyReason::InsufficientTokens,
                shortfall: 15,
            }
        );
    }

    #[tokio::test]
    async fn non_mitra_cannot_be_authorized() {
        let (gate, user, _dir) = test_gate(|db| seed_user(db, Role::Guest, 100)).await;
        assert!(matches!(
            gate.authorize(user, ActionKind::Upload).await,
            Err(GateError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn grant_requires_admin_and_positive_amount() {
        let (gate, mitra, _dir) = test_gate(|db| seed_user(db, Role::Mitra, 5)).await;

        // Non-admin caller: rejected, balance untouched.
        assert!(matches!(
            gate.grant(mitra, mitra, 30).await,
            Err(GateError::Forbidden(_))
        ));

        let admin = {
            let db = gate.db.lock().await;
            let id = seed_user(&db, Role::Admin, 0);
            assert_eq!(db.token_balance(mitra).unwrap(), 5);
            id
        };

        assert!(matches!(
            gate.grant(admin, mitra, 0).await,
            Err(GateError::InvalidAmount(0))
        ));
        assert!(matches!(
            gate.grant(admin, mitra, -30).await,
            Err(GateError::InvalidAmount(-30))
        ));

        let balance = gate.grant(admin, mitra, 30).await.unwrap();
        assert_eq!(balance, 35);
    }

    #[tokio::test]
    async fn set_cost_validates_and_applies() {
        let (gate, _mitra, _dir) = test_gate(|db| seed_user(db, Role::Mitra, 50)).await;
        let admin = {
            let db = gate.db.lock().await;
            seed_user(&db, Role::Admin, 0)
        };

        assert!(matches!(
            gate.set_cost(admin, ActionKind::Upload, 0).await,
            Err(GateError::InvalidAmount(0))
        ));

        // Existing cost unchanged after the rejected update.
        {
            let db = gate.db.lock().await;
            assert_eq!(db.action_cost(ActionKind::Upload).unwrap(), 15);
        }

        gate.set_cost(admin, ActionKind::Upload, 20).await.unwrap();
        {
            let db = gate.db.lock().await;
            assert_eq!(db.action_cost(ActionKind::Upload).unwrap(), 20);
        }
    }

    #[tokio::test]
    async fn concurrent_settles_never_drive_balance_negative() {
        let (gate, user, _dir) = test_gate(|db| seed_user(db, Role::Mitra, 15)).await;

        // Two racing authorize+settle sequences for one 15-token action.
        async fn attempt(gate: TokenGate, user: Uuid) -> Result<i64, GateError> {
            match gate.authorize(user, ActionKind::Upload).await? {
                Decision::Approved { cost } => gate.settle(user, ActionKind::Upload, cost).await,
                Decision::Denied { shortfall, .. } => {
                    Err(GateError::InsufficientTokens { shortfall })
                }
            }
        }

        let (a, b) = tokio::join!(attempt(gate.clone(), user), attempt(gate.clone(), user));

        // Exactly one sequence wins; the loser is denied or told to retry.
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let db = gate.db.lock().await;
        assert_eq!(db.token_balance(user).unwrap(), 0);
        assert_eq!(db.ledger_sum(user).unwrap(), -15);
    }

    #[tokio::test]
    async fn settle_after_external_drain_reports_concurrent_modification() {
        let (gate, user, _dir) = test_gate(|db| seed_user(db, Role::Mitra, 15)).await;

        let decision = gate.authorize(user, ActionKind::Boost).await.unwrap();
        assert!(decision.is_approved());

        // Another request spends the balance between authorize and settle.
        {
            let mut db = gate.db.lock().await;
            db.debit_tokens(user, 15, "upload").unwrap();
        }

        assert!(matches!(
            gate.settle(user, ActionKind::Boost, 15).await,
            Err(GateError::ConcurrentModification)
        ));

        let db = gate.db.lock().await;
        assert_eq!(db.token_balance(user).unwrap(), 0);
    }
}
