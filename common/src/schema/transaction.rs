use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a purchase transaction.
///
/// `Success` and `Failed` are terminal: once reached, the status never
/// changes again and no further ledger movement is tied to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Processing => "processing",
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TxStatus::Pending),
            "processing" => Some(TxStatus::Processing),
            "success" => Some(TxStatus::Success),
            "failed" => Some(TxStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Failed)
    }

    /// Maps a raw provider status to the internal lifecycle,
    /// case-insensitively. Anything unrecognized counts as still in
    /// flight, never as settled.
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "success" | "completed" => TxStatus::Success,
            "failed" | "error" => TxStatus::Failed,
            "pending" => TxStatus::Pending,
            _ => TxStatus::Processing,
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five service categories sold through the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Airtime,
    Data,
    Cable,
    Electricity,
    Education,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Airtime => "airtime",
            ServiceCategory::Data => "data",
            ServiceCategory::Cable => "cable",
            ServiceCategory::Electricity => "electricity",
            ServiceCategory::Education => "education",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "airtime" => Some(ServiceCategory::Airtime),
            "data" => Some(ServiceCategory::Data),
            "cable" => Some(ServiceCategory::Cable),
            "electricity" => Some(ServiceCategory::Electricity),
            "education" => Some(ServiceCategory::Education),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchase attempt. `amount` is the face value, `charged_amount` what
/// the wallet was debited; `reference` is unique across all attempts and is
/// the key webhooks correlate on. `meta` accumulates provider payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: i64,
    pub category: ServiceCategory,
    pub service_id: String,
    pub amount: i64,
    pub charged_amount: i64,
    pub reference: String,
    pub status: TxStatus,
    pub meta: serde_json::Value,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Transaction {
    /// A fresh pending row, before any money moves.
    pub fn new(
        user_id: i64,
        category: ServiceCategory,
        service_id: &str,
        amount: i64,
        charged_amount: i64,
        reference: &str,
    ) -> Self {
        Transaction {
            id: Uuid::new_v4().to_string(),
            user_id,
            category,
            service_id: service_id.to_string(),
            amount,
            charged_amount,
            reference: reference.to_string(),
            status: TxStatus::Pending,
            meta: serde_json::json!({}),
            created_at: None, //set by DB
            updated_at: None, //set by DB
        }
    }
}
