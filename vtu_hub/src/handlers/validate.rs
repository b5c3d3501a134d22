use actix_web::{HttpResponse, post, web};
use common::VtuError;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MeterBody {
    #[serde(default)]
    pub disco: Option<String>,
    #[serde(default)]
    pub meter_number: Option<String>,
    #[serde(default)]
    pub meter_type: Option<String>,
}

#[post("/validate/meter")]
pub async fn validate_meter(
    body: web::Json<MeterBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let disco = body.disco.unwrap_or_default();
    let meter_number = body.meter_number.unwrap_or_default();
    let meter_type = body.meter_type.unwrap_or_default();

    if disco.is_empty() || meter_number.is_empty() || meter_type.is_empty() {
        return Err(VtuError::InvalidRequest(
            "Missing required fields: disco, meter_number, meter_type".to_string(),
        ));
    }

    let reply = app_state
        .gateway
        .validate_meter(&disco, &meter_number, &meter_type)
        .await?;
    Ok(HttpResponse::Ok().json(reply))
}

#[derive(Debug, Deserialize)]
pub struct CableCardBody {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub smartcard_number: Option<String>,
}

#[post("/validate/cable")]
pub async fn validate_cable(
    body: web::Json<CableCardBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let service = body.service.unwrap_or_default();
    let smartcard_number = body.smartcard_number.unwrap_or_default();

    if service.is_empty() || smartcard_number.is_empty() {
        return Err(VtuError::InvalidRequest(
            "Missing required fields: service, smartcard_number".to_string(),
        ));
    }

    let reply = app_state
        .gateway
        .validate_cable(&service, &smartcard_number)
        .await?;
    Ok(HttpResponse::Ok().json(reply))
}
