use actix_web::{HttpResponse, get, post, web};
use common::{Topup, VtuError};
use serde::Deserialize;

use crate::state::AppState;

#[get("/users")]
pub async fn list_users(app_state: web::Data<AppState>) -> Result<HttpResponse, VtuError> {
    let users = app_state.db.get_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/wallets")]
pub async fn list_wallets(app_state: web::Data<AppState>) -> Result<HttpResponse, VtuError> {
    let wallets = app_state.db.get_wallets().await?;
    Ok(HttpResponse::Ok().json(wallets))
}

#[get("/transactions")]
pub async fn list_all_transactions(
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let transactions = app_state.db.get_all_transactions().await?;
    Ok(HttpResponse::Ok().json(transactions))
}

#[get("/topups")]
pub async fn list_topups(app_state: web::Data<AppState>) -> Result<HttpResponse, VtuError> {
    let topups = app_state.db.get_all_topups().await?;
    Ok(HttpResponse::Ok().json(topups))
}

#[derive(Debug, Deserialize)]
pub struct AdminTopupBody {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// Records an externally settled topup (bank transfer, support adjustment)
/// for bookkeeping. The wallet itself is not credited here.
#[post("/topups")]
pub async fn record_topup(
    body: web::Json<AdminTopupBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let amount = body.amount.unwrap_or(0);
    let Some(user_id) = body.user_id else {
        return Err(VtuError::InvalidRequest(
            "User ID and amount are required".to_string(),
        ));
    };
    if amount <= 0 {
        return Err(VtuError::InvalidRequest(
            "User ID and amount are required".to_string(),
        ));
    }

    let mut topup = Topup::new(
        user_id,
        amount,
        body.status.as_deref().unwrap_or("pending"),
        "admin",
    );
    if let Some(meta) = body.meta {
        topup.meta = meta;
    }
    app_state.db.insert_topup(&topup).await?;

    Ok(HttpResponse::Ok().json(topup))
}

#[get("/balance")]
pub async fn provider_balance(app_state: web::Data<AppState>) -> Result<HttpResponse, VtuError> {
    let balance = app_state.gateway.account_balance().await?;
    Ok(HttpResponse::Ok().json(balance))
}
