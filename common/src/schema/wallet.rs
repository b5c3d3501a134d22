use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One balance row per user, in minor currency units (kobo).
/// The balance never goes below zero; the conditional debit in the
/// database layer and the `CHECK` constraint both hold that line.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub balance: i64,
    pub updated_at: Option<NaiveDateTime>,
}
