use common::{TxStatus, VtuError};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// What the provider posts to the webhook endpoint. Anything beyond the two
/// known fields is kept and merged into the transaction meta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// How a webhook was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The transaction moved to the mapped status.
    Applied(TxStatus),
    /// The transaction already carries the mapped status.
    Duplicate,
    /// The transaction is terminal; late signals change nothing.
    AlreadySettled,
}

/// Applies one provider webhook to the transaction it references.
///
/// The rules, in order: a payload without a reference is invalid, an unknown
/// reference is not found, a repeat of the current status is a duplicate,
/// and a terminal transaction never changes again. Otherwise the transaction
/// moves to the mapped status with the payload merged into its meta, and a
/// move into `failed` credits the charged amount back exactly once.
pub async fn apply(
    state: &AppState,
    payload: &WebhookPayload,
) -> Result<ReconcileOutcome, VtuError> {
    let reference = payload
        .reference
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            VtuError::InvalidRequest("Missing reference in webhook payload".to_string())
        })?;

    let mapped = match payload.status.as_deref() {
        Some(raw) => TxStatus::from_provider(raw),
        None => TxStatus::Processing,
    };

    // The row can move underneath us while a purchase settles, so re-read
    // and re-decide until one compare-and-swap lands or a rule says stop.
    loop {
        let tx = state
            .db
            .get_transaction_by_reference(reference)
            .await?
            .ok_or(VtuError::NotFound("Transaction"))?;

        if tx.status == mapped {
            log::info!("Ignoring duplicate webhook update for reference {reference}");
            return Ok(ReconcileOutcome::Duplicate);
        }
        if tx.status.is_terminal() {
            log::info!(
                "Webhook for settled transaction {reference} ignored, status stays {}",
                tx.status
            );
            return Ok(ReconcileOutcome::AlreadySettled);
        }

        let update = serde_json::to_value(payload).unwrap_or_else(|_| serde_json::json!({}));
        let mut meta = tx.meta.clone();
        match meta.as_object_mut() {
            Some(map) => {
                map.insert("webhook_update".to_string(), update);
            }
            None => meta = serde_json::json!({ "webhook_update": update }),
        }

        let settled = state
            .db
            .update_transaction_if_status(&tx.id, tx.status, mapped, &meta)
            .await?;
        if settled {
            if mapped == TxStatus::Failed {
                state
                    .refund_with_retry(tx.user_id, tx.charged_amount, &tx.reference)
                    .await;
            }
            log::info!(
                "Webhook moved transaction {reference} from {} to {mapped}",
                tx.status
            );
            return Ok(ReconcileOutcome::Applied(mapped));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::{self, PurchaseRequest};
    use crate::state::AppState;
    use crate::testutil::{ScriptedGateway, processing_reply, test_state};
    use common::Transaction;

    fn payload(reference: Option<&str>, status: Option<&str>) -> WebhookPayload {
        WebhookPayload {
            reference: reference.map(str::to_string),
            status: status.map(str::to_string),
            extra: serde_json::Map::new(),
        }
    }

    /// Inserts a transaction for user 1 and walks it to the wanted status.
    async fn seed_transaction(state: &AppState, status: TxStatus, charged: i64) -> Transaction {
        let tx = Transaction::new(
            1,
            common::ServiceCategory::Airtime,
            "mtn",
            charged,
            charged,
            "VTU-1700000000000-deadbeef",
        );
        state.db.insert_transaction(&tx).await.unwrap();
        if status != TxStatus::Pending {
            let moved = state
                .db
                .update_transaction_if_status(&tx.id, TxStatus::Pending, status, &tx.meta)
                .await
                .unwrap();
            assert!(moved);
        }
        state.db.get_transaction(&tx.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn success_webhook_settles_a_processing_transaction() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;
        state.ledger.credit(1, 100).await.unwrap();
        let tx = seed_transaction(&state, TxStatus::Processing, 500).await;

        let outcome = apply(&state, &payload(Some(&tx.reference), Some("success")))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied(TxStatus::Success));
        // No money moves on a success signal.
        assert_eq!(state.ledger.balance(1).await.unwrap(), 100);

        let updated = state.db.get_transaction(&tx.id).await.unwrap().unwrap();
        assert_eq!(updated.status, TxStatus::Success);
    }

    #[tokio::test]
    async fn failed_webhook_refunds_the_charge_exactly_once() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;
        state.ledger.credit(1, 1_000).await.unwrap();
        state.ledger.debit(1, 600).await.unwrap();
        let tx = seed_transaction(&state, TxStatus::Processing, 600).await;

        let first = apply(&state, &payload(Some(&tx.reference), Some("failed")))
            .await
            .unwrap();
        assert_eq!(first, ReconcileOutcome::Applied(TxStatus::Failed));
        assert_eq!(state.ledger.balance(1).await.unwrap(), 1_000);

        // The retransmitted webhook changes nothing.
        let second = apply(&state, &payload(Some(&tx.reference), Some("failed")))
            .await
            .unwrap();
        assert_eq!(second, ReconcileOutcome::Duplicate);
        assert_eq!(state.ledger.balance(1).await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn settled_transaction_ignores_a_late_contradiction() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;
        state.ledger.credit(1, 100).await.unwrap();
        let tx = seed_transaction(&state, TxStatus::Success, 500).await;

        let outcome = apply(&state, &payload(Some(&tx.reference), Some("failed")))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::AlreadySettled);
        // No refund either: the success verdict stands.
        assert_eq!(state.ledger.balance(1).await.unwrap(), 100);

        let unchanged = state.db.get_transaction(&tx.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TxStatus::Success);
    }

    #[tokio::test]
    async fn failed_transaction_ignores_a_late_success() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;
        let tx = seed_transaction(&state, TxStatus::Failed, 500).await;

        let outcome = apply(&state, &payload(Some(&tx.reference), Some("success")))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::AlreadySettled);
        let unchanged = state.db.get_transaction(&tx.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TxStatus::Failed);
    }

    #[tokio::test]
    async fn alias_of_the_current_status_is_a_duplicate() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;
        let tx = seed_transaction(&state, TxStatus::Success, 500).await;

        let outcome = apply(&state, &payload(Some(&tx.reference), Some("COMPLETED")))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Duplicate);
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;

        let err = apply(&state, &payload(Some("VTU-1-missing"), Some("success")))
            .await
            .unwrap_err();

        assert!(matches!(err, VtuError::NotFound("Transaction")));
    }

    #[tokio::test]
    async fn missing_reference_is_rejected() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;

        let err = apply(&state, &payload(None, Some("success"))).await.unwrap_err();
        assert!(err.to_string().contains("Missing reference"));

        let err = apply(&state, &payload(Some(""), Some("success")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing reference"));
    }

    #[tokio::test]
    async fn unrecognized_status_parks_the_row_as_processing() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;
        state.ledger.credit(1, 100).await.unwrap();
        let tx = seed_transaction(&state, TxStatus::Pending, 500).await;

        let outcome = apply(&state, &payload(Some(&tx.reference), Some("reversed")))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied(TxStatus::Processing));
        // An unmapped signal never moves money.
        assert_eq!(state.ledger.balance(1).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn payload_without_status_counts_as_processing() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;
        let tx = seed_transaction(&state, TxStatus::Pending, 500).await;

        let outcome = apply(&state, &payload(Some(&tx.reference), None))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied(TxStatus::Processing));
    }

    #[tokio::test]
    async fn webhook_payload_lands_under_webhook_update_in_meta() {
        let state = test_state(ScriptedGateway::new(Vec::new())).await;
        let tx = seed_transaction(&state, TxStatus::Pending, 500).await;

        let mut extra = serde_json::Map::new();
        extra.insert("order_id".to_string(), serde_json::json!(90817));
        let payload = WebhookPayload {
            reference: Some(tx.reference.clone()),
            status: Some("completed".to_string()),
            extra,
        };

        apply(&state, &payload).await.unwrap();

        let updated = state.db.get_transaction(&tx.id).await.unwrap().unwrap();
        assert_eq!(updated.status, TxStatus::Success);
        assert_eq!(updated.meta["webhook_update"]["order_id"], 90817);
        assert_eq!(updated.meta["webhook_update"]["status"], "completed");
    }

    #[tokio::test]
    async fn late_failure_after_a_processing_purchase_refunds_in_full() {
        let state = test_state(ScriptedGateway::new(vec![Ok(processing_reply())])).await;
        state.ledger.credit(1, 1_000).await.unwrap();

        let request = PurchaseRequest::Airtime {
            network: "mtn".to_string(),
            phone: "08030000000".to_string(),
            amount: 700,
        };
        let outcome = purchase::execute(&state, 1, request).await.unwrap();
        assert_eq!(outcome.status, TxStatus::Processing);
        assert_eq!(state.ledger.balance(1).await.unwrap(), 300);

        let applied = apply(&state, &payload(Some(&outcome.reference), Some("failed")))
            .await
            .unwrap();

        assert_eq!(applied, ReconcileOutcome::Applied(TxStatus::Failed));
        assert_eq!(state.ledger.balance(1).await.unwrap(), 1_000);
    }
}
