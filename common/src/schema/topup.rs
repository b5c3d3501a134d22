use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A wallet funding record. Unlike purchase transactions these carry a
/// free-form status string: user-facing top-ups are settled immediately,
/// admin-created ones may sit at "pending" as pure bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topup {
    pub id: String,
    pub user_id: i64,
    pub amount: i64,
    pub status: String,
    pub meta: serde_json::Value,
    pub created_at: Option<NaiveDateTime>,
}

impl Topup {
    pub fn new(user_id: i64, amount: i64, status: &str, source: &str) -> Self {
        Topup {
            id: Uuid::new_v4().to_string(),
            user_id,
            amount,
            status: status.to_string(),
            meta: serde_json::json!({ "source": source }),
            created_at: None, //set by DB
        }
    }
}
