use actix_web::{HttpResponse, post, web};
use common::VtuError;
use serde_json::json;

use crate::reconcile::{self, ReconcileOutcome, WebhookPayload};
use crate::state::AppState;

/// Provider callbacks land here. The route sits outside the JWT scope
/// because the provider holds no session; it only knows our references.
#[post("/webhook/vtu")]
pub async fn provider_webhook(
    payload: web::Json<WebhookPayload>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let payload = payload.into_inner();

    let message = match reconcile::apply(&app_state, &payload).await {
        Ok(ReconcileOutcome::Applied(_)) => "Transaction updated",
        Ok(ReconcileOutcome::Duplicate) => "Duplicate update ignored",
        Ok(ReconcileOutcome::AlreadySettled) => "Transaction already settled",
        Err(VtuError::NotFound(what)) => {
            log::error!(
                "Transaction not found for webhook reference: {:?}",
                payload.reference
            );
            return Err(VtuError::NotFound(what));
        }
        Err(err) => return Err(err),
    };

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": message })))
}
