use common::{ProviderReply, ServiceCategory, Transaction, TxStatus, VtuError, generate_reference};
use serde::Serialize;

use crate::state::AppState;

/// One purchase order, shaped per service category. Categories whose price
/// comes from a provider catalog (data, cable, education) may omit the
/// amount, in which case nothing is charged up front and the row records a
/// zero charge.
#[derive(Debug, Clone)]
pub enum PurchaseRequest {
    Airtime {
        network: String,
        phone: String,
        amount: i64,
    },
    Data {
        network: String,
        phone: String,
        plan_id: String,
        amount: i64,
    },
    Cable {
        service: String,
        smartcard_number: String,
        plan_id: String,
        amount: i64,
    },
    Electricity {
        disco: String,
        meter_number: String,
        meter_type: String,
        amount: i64,
    },
    Education {
        service: String,
        quantity: u32,
        amount: i64,
    },
}

impl PurchaseRequest {
    pub fn category(&self) -> ServiceCategory {
        match self {
            PurchaseRequest::Airtime { .. } => ServiceCategory::Airtime,
            PurchaseRequest::Data { .. } => ServiceCategory::Data,
            PurchaseRequest::Cable { .. } => ServiceCategory::Cable,
            PurchaseRequest::Electricity { .. } => ServiceCategory::Electricity,
            PurchaseRequest::Education { .. } => ServiceCategory::Education,
        }
    }

    /// The catalog identifier recorded on the transaction row.
    pub fn service_id(&self) -> &str {
        match self {
            PurchaseRequest::Airtime { network, .. } => network,
            PurchaseRequest::Data { plan_id, .. } => plan_id,
            PurchaseRequest::Cable { plan_id, .. } => plan_id,
            PurchaseRequest::Electricity { disco, .. } => disco,
            PurchaseRequest::Education { service, .. } => service,
        }
    }

    pub fn charged_amount(&self) -> i64 {
        match self {
            PurchaseRequest::Airtime { amount, .. }
            | PurchaseRequest::Data { amount, .. }
            | PurchaseRequest::Cable { amount, .. }
            | PurchaseRequest::Electricity { amount, .. }
            | PurchaseRequest::Education { amount, .. } => *amount,
        }
    }

    /// Field presence rules per category. Empty strings count as missing,
    /// and airtime and electricity need a positive amount.
    pub fn validate(&self) -> Result<(), VtuError> {
        if self.charged_amount() < 0 {
            return Err(VtuError::InvalidRequest(
                "Amount must not be negative".to_string(),
            ));
        }

        let complete = match self {
            PurchaseRequest::Airtime {
                network,
                phone,
                amount,
            } => !network.is_empty() && !phone.is_empty() && *amount > 0,
            PurchaseRequest::Data {
                network,
                phone,
                plan_id,
                ..
            } => !network.is_empty() && !phone.is_empty() && !plan_id.is_empty(),
            PurchaseRequest::Cable {
                service,
                smartcard_number,
                plan_id,
                ..
            } => !service.is_empty() && !smartcard_number.is_empty() && !plan_id.is_empty(),
            PurchaseRequest::Electricity {
                disco,
                meter_number,
                meter_type,
                amount,
            } => {
                !disco.is_empty()
                    && !meter_number.is_empty()
                    && !meter_type.is_empty()
                    && *amount > 0
            }
            PurchaseRequest::Education {
                service, quantity, ..
            } => !service.is_empty() && *quantity >= 1,
        };

        if complete {
            Ok(())
        } else {
            Err(VtuError::InvalidRequest(format!(
                "Missing required fields: {}",
                self.required_fields()
            )))
        }
    }

    fn required_fields(&self) -> &'static str {
        match self {
            PurchaseRequest::Airtime { .. } => "network, phone, amount",
            PurchaseRequest::Data { .. } => "network, phone, plan_id",
            PurchaseRequest::Cable { .. } => "service, smartcard_number, plan_id",
            PurchaseRequest::Electricity { .. } => "disco, meter_number, meter_type, amount",
            PurchaseRequest::Education { .. } => "service, quantity",
        }
    }
}

/// What the caller gets back once the provider answered: the reference to
/// track the purchase by, the status it settled to for now, and the raw
/// provider reply.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOutcome {
    pub reference: String,
    pub status: TxStatus,
    pub data: serde_json::Value,
}

/// Runs one purchase end to end: validate, funds check, reserve (pending
/// row plus wallet debit), provider call, settle. A provider error credits
/// the debit back and marks the row failed before the error is returned.
pub async fn execute(
    state: &AppState,
    user_id: i64,
    request: PurchaseRequest,
) -> Result<PurchaseOutcome, VtuError> {
    request.validate()?;

    let charged = request.charged_amount();
    let balance = state.ledger.balance(user_id).await?;
    if charged > balance {
        return Err(VtuError::InsufficientFunds);
    }

    let reference = generate_reference();
    let pending = Transaction::new(
        user_id,
        request.category(),
        request.service_id(),
        charged,
        charged,
        &reference,
    );
    state.db.insert_transaction(&pending).await?;

    if charged > 0 {
        if let Err(err) = state.ledger.debit(user_id, charged).await {
            // Lost a race with another spend between the funds check and here.
            let meta = serde_json::json!({ "error": err.to_string() });
            state
                .db
                .update_transaction_if_status(&pending.id, TxStatus::Pending, TxStatus::Failed, &meta)
                .await?;
            return Err(err);
        }
    }

    match dispatch(state, &request, &reference).await {
        Ok(reply) => {
            let status = if reply.success {
                TxStatus::Success
            } else {
                TxStatus::Processing
            };
            let meta = reply.to_meta();

            let settled = state
                .db
                .update_transaction_if_status(&pending.id, TxStatus::Pending, status, &meta)
                .await?;
            if !settled {
                // A webhook settled the row first; its verdict stands.
                let current = state
                    .db
                    .get_transaction(&pending.id)
                    .await?
                    .ok_or(VtuError::NotFound("Transaction"))?;
                return Ok(PurchaseOutcome {
                    reference,
                    status: current.status,
                    data: meta,
                });
            }

            Ok(PurchaseOutcome {
                reference,
                status,
                data: meta,
            })
        }
        Err(err) => {
            let meta = serde_json::json!({ "error": err.to_string() });
            let settled = state
                .db
                .update_transaction_if_status(&pending.id, TxStatus::Pending, TxStatus::Failed, &meta)
                .await?;
            // Only the writer that moved the row to failed owes the refund.
            if settled && charged > 0 {
                state.refund_with_retry(user_id, charged, &reference).await;
            }
            Err(err)
        }
    }
}

async fn dispatch(
    state: &AppState,
    request: &PurchaseRequest,
    reference: &str,
) -> Result<ProviderReply, VtuError> {
    match request {
        PurchaseRequest::Airtime {
            network,
            phone,
            amount,
        } => state.gateway.airtime(network, phone, *amount, reference).await,
        PurchaseRequest::Data {
            network,
            phone,
            plan_id,
            ..
        } => state.gateway.data_bundle(network, phone, plan_id, reference).await,
        PurchaseRequest::Cable {
            service,
            smartcard_number,
            plan_id,
            ..
        } => {
            state
                .gateway
                .cable_subscribe(service, smartcard_number, plan_id, reference)
                .await
        }
        PurchaseRequest::Electricity {
            disco,
            meter_number,
            meter_type,
            amount,
        } => {
            state
                .gateway
                .electricity_pay(disco, meter_number, meter_type, *amount, reference)
                .await
        }
        PurchaseRequest::Education {
            service, quantity, ..
        } => state.gateway.education_pins(service, *quantity, reference).await,
    }
}
