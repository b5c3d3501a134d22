use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProviderReply, ValidationReply, VtuError, VtuGateway};
use tokio::sync::Mutex;

use crate::state::AppState;

/// Gateway stand-in that answers purchase and requery calls from a prepared
/// script, in order. Validation calls always pass with a fixed customer.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<ProviderReply, String>>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<ProviderReply, String>>) -> Arc<Self> {
        Arc::new(ScriptedGateway {
            replies: Mutex::new(replies.into()),
        })
    }

    async fn next_reply(&self) -> Result<ProviderReply, VtuError> {
        let next = self.replies.lock().await.pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(VtuError::Provider(message)),
            None => panic!("gateway called more times than scripted"),
        }
    }

    fn validation_pass(&self) -> ValidationReply {
        ValidationReply {
            success: true,
            name: Some("TEST CUSTOMER".to_string()),
            address: Some("12 TEST CLOSE".to_string()),
            extra: Default::default(),
        }
    }
}

#[async_trait]
impl VtuGateway for ScriptedGateway {
    async fn airtime(
        &self,
        _network: &str,
        _phone: &str,
        _amount: i64,
        _reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        self.next_reply().await
    }

    async fn data_bundle(
        &self,
        _network: &str,
        _phone: &str,
        _plan_id: &str,
        _reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        self.next_reply().await
    }

    async fn cable_subscribe(
        &self,
        _service: &str,
        _smartcard_number: &str,
        _plan_id: &str,
        _reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        self.next_reply().await
    }

    async fn electricity_pay(
        &self,
        _disco: &str,
        _meter_number: &str,
        _meter_type: &str,
        _amount: i64,
        _reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        self.next_reply().await
    }

    async fn education_pins(
        &self,
        _service: &str,
        _quantity: u32,
        _reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        self.next_reply().await
    }

    async fn validate_meter(
        &self,
        _disco: &str,
        _meter_number: &str,
        _meter_type: &str,
    ) -> Result<ValidationReply, VtuError> {
        Ok(self.validation_pass())
    }

    async fn validate_cable(
        &self,
        _service: &str,
        _smartcard_number: &str,
    ) -> Result<ValidationReply, VtuError> {
        Ok(self.validation_pass())
    }

    async fn transaction_details(&self, _reference: &str) -> Result<ProviderReply, VtuError> {
        self.next_reply().await
    }

    async fn account_balance(&self) -> Result<serde_json::Value, VtuError> {
        Ok(serde_json::json!({ "success": true, "balance": 250_000 }))
    }
}

pub fn success_reply() -> ProviderReply {
    ProviderReply {
        success: true,
        status: Some("success".to_string()),
        message: None,
        extra: Default::default(),
    }
}

pub fn processing_reply() -> ProviderReply {
    ProviderReply {
        success: false,
        status: None,
        message: Some("queued for delivery".to_string()),
        extra: Default::default(),
    }
}

/// Fresh in-memory state wired to the given gateway, with a throwaway
/// refund queue file.
pub async fn test_state(gateway: Arc<dyn VtuGateway>) -> AppState {
    let queue_path =
        std::env::temp_dir().join(format!("refund-queue-{}.json", uuid::Uuid::new_v4()));
    AppState::with_gateway("sqlite::memory:", gateway, queue_path)
        .await
        .unwrap()
}
