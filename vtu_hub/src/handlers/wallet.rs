use actix_web::{HttpResponse, get, post, web};
use common::{Topup, User, VtuError};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[get("/wallet")]
pub async fn my_wallet(
    user: User,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let balance = app_state.ledger.balance(user.id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": user.id,
        "balance": balance,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TopupBody {
    #[serde(default)]
    pub amount: Option<i64>,
}

/// Self-service wallet funding. There is no payment processor behind it,
/// so the topup settles immediately and is recorded as such.
#[post("/wallet/topup")]
pub async fn topup_wallet(
    user: User,
    body: web::Json<TopupBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let amount = body.amount.unwrap_or(0);
    if amount <= 0 {
        return Err(VtuError::InvalidRequest("Invalid amount".to_string()));
    }

    let topup = Topup::new(user.id, amount, "success", "mock_topup");
    app_state.db.insert_topup(&topup).await?;
    app_state.ledger.credit(user.id, amount).await?;

    let new_balance = app_state.ledger.balance(user.id).await?;
    log::info!("Wallet topup of {amount} for user {} applied", user.id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "topup_id": topup.id,
        "new_balance": new_balance,
    })))
}
