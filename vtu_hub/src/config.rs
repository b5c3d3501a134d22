use std::time::Duration;

use anyhow::Context;

use crate::state::AppState;

pub struct AppConfig {
    pub database_url: String,
    pub provider_base_url: String,
    pub provider_api_key: String,
    pub provider_timeout: Duration,
    pub refund_queue_json: String,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let provider_base_url =
            std::env::var("PROVIDER_BASE_URL").context("PROVIDER_BASE_URL must be set")?;

        let provider_api_key =
            std::env::var("PROVIDER_API_KEY").context("PROVIDER_API_KEY must be set")?;

        let provider_timeout_secs = match std::env::var("PROVIDER_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?,
            Err(_) => 30,
        };

        let refund_queue_json = std::env::var("REFUND_QUEUE_JSON")
            .unwrap_or_else(|_| "pending_refunds.json".to_string());

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        Ok(Self {
            database_url,
            provider_base_url,
            provider_api_key,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            refund_queue_json,
            bind_addr,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        AppState::new(
            &self.database_url,
            &self.provider_base_url,
            &self.provider_api_key,
            self.provider_timeout,
            &self.refund_queue_json,
        )
        .await
        .context("Failed to initialize AppState")
    }
}
