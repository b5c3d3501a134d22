use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VtuError;

/// Provider answer for purchase-style calls. Only `success` drives local
/// settlement; unknown fields ride along in `extra` so transaction meta and
/// audit trails keep the full payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProviderReply {
    pub fn to_meta(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// Answer for meter/smartcard validation lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Boundary to the upstream VTU provider. The service treats it as a black
/// box: a request goes out, a reply or an error comes back, and settlement
/// truth may still arrive later over the webhook.
#[async_trait]
pub trait VtuGateway: Send + Sync {
    async fn airtime(
        &self,
        network: &str,
        phone: &str,
        amount: i64,
        reference: &str,
    ) -> Result<ProviderReply, VtuError>;

    async fn data_bundle(
        &self,
        network: &str,
        phone: &str,
        plan_id: &str,
        reference: &str,
    ) -> Result<ProviderReply, VtuError>;

    async fn cable_subscribe(
        &self,
        service: &str,
        smartcard_number: &str,
        plan_id: &str,
        reference: &str,
    ) -> Result<ProviderReply, VtuError>;

    async fn electricity_pay(
        &self,
        disco: &str,
        meter_number: &str,
        meter_type: &str,
        amount: i64,
        reference: &str,
    ) -> Result<ProviderReply, VtuError>;

    async fn education_pins(
        &self,
        service: &str,
        quantity: u32,
        reference: &str,
    ) -> Result<ProviderReply, VtuError>;

    async fn validate_meter(
        &self,
        disco: &str,
        meter_number: &str,
        meter_type: &str,
    ) -> Result<ValidationReply, VtuError>;

    async fn validate_cable(
        &self,
        service: &str,
        smartcard_number: &str,
    ) -> Result<ValidationReply, VtuError>;

    async fn transaction_details(&self, reference: &str) -> Result<ProviderReply, VtuError>;

    async fn account_balance(&self) -> Result<serde_json::Value, VtuError>;
}

/// Talks to the real provider REST API with token auth and JSON bodies.
/// Timeouts surface as provider errors like any other upstream failure.
pub struct HttpVtuGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpVtuGateway {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build provider HTTP client")?;

        Ok(HttpVtuGateway {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn post(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, VtuError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| VtuError::Provider(format!("request to {endpoint} failed: {e}")))?;

        reject_http_failure(endpoint, response).await
    }

    async fn get(&self, endpoint: &str) -> Result<reqwest::Response, VtuError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .send()
            .await
            .map_err(|e| VtuError::Provider(format!("request to {endpoint} failed: {e}")))?;

        reject_http_failure(endpoint, response).await
    }
}

async fn reject_http_failure(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, VtuError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VtuError::Provider(format!(
            "{endpoint} answered {status}: {body}"
        )));
    }
    Ok(response)
}

async fn parse_reply(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<ProviderReply, VtuError> {
    response
        .json::<ProviderReply>()
        .await
        .map_err(|e| VtuError::Provider(format!("invalid JSON from {endpoint}: {e}")))
}

#[async_trait]
impl VtuGateway for HttpVtuGateway {
    async fn airtime(
        &self,
        network: &str,
        phone: &str,
        amount: i64,
        reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        let response = self
            .post(
                "/airtime",
                serde_json::json!({
                    "network": network,
                    "phone": phone,
                    "amount": amount,
                    "reference": reference,
                }),
            )
            .await?;
        parse_reply("/airtime", response).await
    }

    async fn data_bundle(
        &self,
        network: &str,
        phone: &str,
        plan_id: &str,
        reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        let response = self
            .post(
                "/data",
                serde_json::json!({
                    "network": network,
                    "phone": phone,
                    "plan_id": plan_id,
                    "reference": reference,
                }),
            )
            .await?;
        parse_reply("/data", response).await
    }

    async fn cable_subscribe(
        &self,
        service: &str,
        smartcard_number: &str,
        plan_id: &str,
        reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        let response = self
            .post(
                "/sub-cable",
                serde_json::json!({
                    "service": service,
                    "smartcard_number": smartcard_number,
                    "plan_id": plan_id,
                    "reference": reference,
                }),
            )
            .await?;
        parse_reply("/sub-cable", response).await
    }

    async fn electricity_pay(
        &self,
        disco: &str,
        meter_number: &str,
        meter_type: &str,
        amount: i64,
        reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        let response = self
            .post(
                "/pay-electric",
                serde_json::json!({
                    "disco": disco,
                    "meter_number": meter_number,
                    "meter_type": meter_type,
                    "amount": amount,
                    "reference": reference,
                }),
            )
            .await?;
        parse_reply("/pay-electric", response).await
    }

    async fn education_pins(
        &self,
        service: &str,
        quantity: u32,
        reference: &str,
    ) -> Result<ProviderReply, VtuError> {
        let response = self
            .post(
                "/education",
                serde_json::json!({
                    "service": service,
                    "quantity": quantity,
                    "reference": reference,
                }),
            )
            .await?;
        parse_reply("/education", response).await
    }

    async fn validate_meter(
        &self,
        disco: &str,
        meter_number: &str,
        meter_type: &str,
    ) -> Result<ValidationReply, VtuError> {
        let response = self
            .post(
                "/validate-meter",
                serde_json::json!({
                    "disco": disco,
                    "meter_number": meter_number,
                    "meter_type": meter_type,
                }),
            )
            .await?;
        response
            .json::<ValidationReply>()
            .await
            .map_err(|e| VtuError::Provider(format!("invalid JSON from /validate-meter: {e}")))
    }

    async fn validate_cable(
        &self,
        service: &str,
        smartcard_number: &str,
    ) -> Result<ValidationReply, VtuError> {
        let response = self
            .post(
                "/validate-cable",
                serde_json::json!({
                    "service": service,
                    "smartcard_number": smartcard_number,
                }),
            )
            .await?;
        response
            .json::<ValidationReply>()
            .await
            .map_err(|e| VtuError::Provider(format!("invalid JSON from /validate-cable: {e}")))
    }

    async fn transaction_details(&self, reference: &str) -> Result<ProviderReply, VtuError> {
        let response = self
            .post("/transaction", serde_json::json!({ "reference": reference }))
            .await?;
        parse_reply("/transaction", response).await
    }

    async fn account_balance(&self) -> Result<serde_json::Value, VtuError> {
        let response = self.get("/balance").await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| VtuError::Provider(format!("invalid JSON from /balance: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_keeps_unknown_fields() {
        let reply: ProviderReply = serde_json::from_str(
            r#"{"success": true, "status": "Completed", "order_id": 991, "fee": "12.5"}"#,
        )
        .unwrap();
        assert!(reply.success);
        assert_eq!(reply.status.as_deref(), Some("Completed"));
        assert_eq!(reply.extra["order_id"], serde_json::json!(991));

        let meta = reply.to_meta();
        assert_eq!(meta["order_id"], serde_json::json!(991));
        assert_eq!(meta["fee"], serde_json::json!("12.5"));
    }

    #[test]
    fn missing_success_defaults_to_false() {
        let reply: ProviderReply =
            serde_json::from_str(r#"{"message": "queued for delivery"}"#).unwrap();
        assert!(!reply.success);
        assert_eq!(reply.message.as_deref(), Some("queued for delivery"));
        assert!(reply.status.is_none());
    }

    #[test]
    fn validation_reply_carries_customer_details() {
        let reply: ValidationReply = serde_json::from_str(
            r#"{"success": true, "name": "JOHN DOE", "address": "12 MAIN ST"}"#,
        )
        .unwrap();
        assert!(reply.success);
        assert_eq!(reply.name.as_deref(), Some("JOHN DOE"));
        assert_eq!(reply.address.as_deref(), Some("12 MAIN ST"));
    }
}
