use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use anyhow::{Context, Result};
use backoff::ExponentialBackoff;
use common::{Database, HttpVtuGateway, Ledger, VtuError, VtuGateway};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

pub struct AppState {
    pub db: Arc<Database>,
    pub ledger: Ledger,
    pub gateway: Arc<dyn VtuGateway>,
    pub refunds: RefundQueue,
}

impl AppState {
    pub async fn new<P: AsRef<Path>>(
        database_url: &str,
        provider_base_url: &str,
        provider_api_key: &str,
        provider_timeout: Duration,
        refund_queue_path: P,
    ) -> Result<Self> {
        let gateway = Arc::new(HttpVtuGateway::new(
            provider_base_url,
            provider_api_key,
            provider_timeout,
        )?);
        Self::with_gateway(database_url, gateway, refund_queue_path).await
    }

    pub async fn with_gateway<P: AsRef<Path>>(
        database_url: &str,
        gateway: Arc<dyn VtuGateway>,
        refund_queue_path: P,
    ) -> Result<Self> {
        let db = Arc::new(Database::new(database_url).await?);
        log::info!("Database initialized successfully!");

        let ledger = Ledger::new(db.clone());
        let refunds = RefundQueue::load(refund_queue_path).await?;

        Ok(AppState {
            db,
            ledger,
            gateway,
            refunds,
        })
    }

    /// Credits `amount` back to the user's wallet after a purchase fell
    /// through, retrying transient database errors with exponential backoff.
    /// When retries run out the refund is parked in the persistent queue for
    /// the background worker and the fault is logged for operators, so the
    /// caller's response does not block on it.
    pub async fn refund_with_retry(&self, user_id: i64, amount: i64, reference: &str) {
        if amount == 0 {
            return;
        }

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(10)),
            ..ExponentialBackoff::default()
        };

        let attempt = || async {
            self.ledger.credit(user_id, amount).await.map_err(|err| match err {
                VtuError::Database(_) => backoff::Error::transient(err),
                other => backoff::Error::permanent(other),
            })
        };

        if let Err(err) = backoff::future::retry(policy, attempt).await {
            let fault = VtuError::Consistency(format!(
                "refund of {amount} to user {user_id} for {reference} not applied: {err}"
            ));
            log::error!("{fault}");
            let refund = PendingRefund {
                user_id,
                amount,
                reference: reference.to_string(),
            };
            if let Err(e) = self.refunds.push_and_persist(refund).await {
                log::error!("Failed to persist refund queue: {e:#}");
            }
        }
    }
}

/// A wallet credit that is owed but could not be applied yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRefund {
    pub user_id: i64,
    pub amount: i64,
    pub reference: String,
}

/// A persistent queue of refunds, retried until the wallet accepts them.
pub struct RefundQueue {
    path: PathBuf,
    pub ops: Mutex<Vec<PendingRefund>>,
}

impl RefundQueue {
    /// Asynchronously load the refund queue from disk, creating the file if it doesn't exist.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .await
            .context("Failed to open refund queue file")?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .await
            .context("Failed to read refund queue file")?;

        let ops: Vec<PendingRefund> = if contents.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&contents).context("Failed to parse refund queue file")?
        };

        Ok(RefundQueue {
            path,
            ops: Mutex::new(ops),
        })
    }

    /// Asynchronously save the refund queue to disk.
    pub async fn save(&self) -> Result<()> {
        let ops = self.ops.lock().await;
        let serialized =
            serde_json::to_string_pretty(&*ops).context("Failed to serialize refund queue")?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await
            .context("Failed to open refund queue file for writing")?;

        file.write_all(serialized.as_bytes())
            .await
            .context("Failed to write refund queue file")?;

        Ok(())
    }

    /// Append a refund and persist the queue immediately.
    pub async fn push_and_persist(&self, refund: PendingRefund) -> Result<()> {
        {
            let mut ops = self.ops.lock().await;
            ops.push(refund);
        }
        self.save().await.context("Failed to save refund queue")
    }

    /// Attempt every queued refund, keeping the ones that still fail.
    pub async fn flush(&self, ledger: &Ledger) -> Result<()> {
        let pending = {
            let mut ops = self.ops.lock().await;
            std::mem::take(&mut *ops)
        };

        let mut remaining = Vec::new();
        for refund in pending {
            match ledger.credit(refund.user_id, refund.amount).await {
                Ok(()) => {
                    log::info!(
                        "Queued refund of {} to user {} for {} applied",
                        refund.amount,
                        refund.user_id,
                        refund.reference
                    );
                }
                Err(e) => {
                    log::error!(
                        "Queued refund for {} failed, will retry later: {:?}",
                        refund.reference,
                        e
                    );
                    remaining.push(refund);
                }
            }
        }

        {
            let mut ops = self.ops.lock().await;
            ops.extend(remaining);
        }
        self.save().await.context("Failed to save refund queue")
    }
}

/// Background loop that retries queued refunds until they apply.
pub async fn start_refund_worker(data: web::Data<AppState>) {
    loop {
        tokio::time::sleep(Duration::from_secs(60)).await;

        let queued = data.refunds.ops.lock().await.len();
        if queued == 0 {
            continue;
        }

        log::info!("Retrying {queued} queued wallet refunds");
        if let Err(e) = data.refunds.flush(&data.ledger).await {
            log::error!("Refund queue flush failed: {e:#}");
        }
    }
}
