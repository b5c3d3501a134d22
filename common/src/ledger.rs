use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::Database;
use crate::error::VtuError;

/// Serializes wallet movement per user and enforces the balance rules:
/// a balance never goes below zero, zero amounts are no-ops, negatives are
/// rejected. SQLite has no row locks to lease, so a per-user mutex plus the
/// conditional UPDATE in the database layer carry the atomicity.
pub struct Ledger {
    db: Arc<Database>,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl Ledger {
    pub fn new(db: Arc<Database>) -> Self {
        Ledger {
            db,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        let mut table = self.locks.lock().await;
        table.entry(user_id).or_default().clone()
    }

    /// Current balance in minor units. A user without a wallet has no
    /// balance, not a zero one.
    pub async fn balance(&self, user_id: i64) -> Result<i64, VtuError> {
        match self.db.fetch_wallet(user_id).await? {
            Some(wallet) => Ok(wallet.balance),
            None => Err(VtuError::NotFound("Wallet")),
        }
    }

    /// Removes `amount` from the wallet if it holds at least that much.
    pub async fn debit(&self, user_id: i64, amount: i64) -> Result<(), VtuError> {
        if amount == 0 {
            return Ok(());
        }
        if amount < 0 {
            return Err(VtuError::InvalidRequest(
                "Debit amount must not be negative".to_string(),
            ));
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        if self.db.debit_wallet_if_funded(user_id, amount).await? == 1 {
            return Ok(());
        }
        match self.db.fetch_wallet(user_id).await? {
            Some(_) => Err(VtuError::InsufficientFunds),
            None => Err(VtuError::NotFound("Wallet")),
        }
    }

    /// Adds `amount` to the wallet, creating it on first use.
    pub async fn credit(&self, user_id: i64, amount: i64) -> Result<(), VtuError> {
        if amount == 0 {
            return Ok(());
        }
        if amount < 0 {
            return Err(VtuError::InvalidRequest(
                "Credit amount must not be negative".to_string(),
            ));
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        self.db.upsert_wallet_credit(user_id, amount).await
    }
}
