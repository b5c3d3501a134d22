use actix_web::{HttpResponse, get, post, web};
use common::{TxStatus, User, VtuError};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[get("/transactions")]
pub async fn get_transactions(
    user: User,
    query: web::Query<TransactionQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let transactions = match query.status.as_deref() {
        Some(raw) => {
            let status = TxStatus::parse(raw).ok_or_else(|| {
                VtuError::InvalidRequest(
                    "Status must be one of 'pending', 'processing', 'success' or 'failed'"
                        .to_string(),
                )
            })?;
            app_state
                .db
                .get_transactions_for_user_by_status(user.id, status)
                .await?
        }
        None => app_state.db.get_transactions_for_user(user.id).await?,
    };

    Ok(HttpResponse::Ok().json(transactions))
}

#[derive(Debug, Deserialize)]
pub struct RequeryBody {
    #[serde(default)]
    pub reference: Option<String>,
}

/// Asks the provider for its current view of a transaction. The reply is
/// returned as-is; settling the row stays the webhook's job.
#[post("/transactions/requery")]
pub async fn requery_transaction(
    body: web::Json<RequeryBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let reference = body
        .reference
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            VtuError::InvalidRequest("Missing required field: reference".to_string())
        })?;

    let reply = app_state.gateway.transaction_details(&reference).await?;
    Ok(HttpResponse::Ok().json(reply))
}

#[get("/transactions/{id}")]
pub async fn get_transaction_by_id(
    user: User,
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let id = path.into_inner();
    let transaction = app_state
        .db
        .get_transaction(&id)
        .await?
        .filter(|tx| tx.user_id == user.id)
        .ok_or(VtuError::NotFound("Transaction"))?;

    Ok(HttpResponse::Ok().json(transaction))
}
