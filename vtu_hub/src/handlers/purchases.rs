use actix_web::{HttpResponse, post, web};
use common::{User, VtuError};
use serde::Deserialize;
use serde_json::json;

use crate::purchase::{self, PurchaseOutcome, PurchaseRequest};
use crate::state::AppState;

/// Missing fields deserialize as defaults and are rejected by the purchase
/// validation with a message naming them, instead of a bare 400 from serde.
#[derive(Debug, Deserialize)]
pub struct AirtimeBody {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DataBody {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CableBody {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub smartcard_number: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ElectricityBody {
    #[serde(default)]
    pub disco: Option<String>,
    #[serde(default)]
    pub meter_number: Option<String>,
    #[serde(default)]
    pub meter_type: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct EducationBody {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub amount: Option<i64>,
}

fn respond(outcome: PurchaseOutcome) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "reference": outcome.reference,
        "status": outcome.status,
        "data": outcome.data,
    }))
}

#[post("/purchase/airtime")]
pub async fn buy_airtime(
    user: User,
    body: web::Json<AirtimeBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let request = PurchaseRequest::Airtime {
        network: body.network.unwrap_or_default(),
        phone: body.phone.unwrap_or_default(),
        amount: body.amount.unwrap_or(0),
    };

    let outcome = purchase::execute(&app_state, user.id, request).await?;
    Ok(respond(outcome))
}

#[post("/purchase/data")]
pub async fn buy_data(
    user: User,
    body: web::Json<DataBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let request = PurchaseRequest::Data {
        network: body.network.unwrap_or_default(),
        phone: body.phone.unwrap_or_default(),
        plan_id: body.plan_id.unwrap_or_default(),
        amount: body.amount.unwrap_or(0),
    };

    let outcome = purchase::execute(&app_state, user.id, request).await?;
    Ok(respond(outcome))
}

#[post("/purchase/cable")]
pub async fn subscribe_cable(
    user: User,
    body: web::Json<CableBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let request = PurchaseRequest::Cable {
        service: body.service.unwrap_or_default(),
        smartcard_number: body.smartcard_number.unwrap_or_default(),
        plan_id: body.plan_id.unwrap_or_default(),
        amount: body.amount.unwrap_or(0),
    };

    let outcome = purchase::execute(&app_state, user.id, request).await?;
    Ok(respond(outcome))
}

#[post("/purchase/electricity")]
pub async fn pay_electricity(
    user: User,
    body: web::Json<ElectricityBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let request = PurchaseRequest::Electricity {
        disco: body.disco.unwrap_or_default(),
        meter_number: body.meter_number.unwrap_or_default(),
        meter_type: body.meter_type.unwrap_or_default(),
        amount: body.amount.unwrap_or(0),
    };

    let outcome = purchase::execute(&app_state, user.id, request).await?;
    Ok(respond(outcome))
}

#[post("/purchase/education")]
pub async fn buy_education(
    user: User,
    body: web::Json<EducationBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, VtuError> {
    let body = body.into_inner();
    let request = PurchaseRequest::Education {
        service: body.service.unwrap_or_default(),
        quantity: body.quantity.unwrap_or(0),
        amount: body.amount.unwrap_or(0),
    };

    let outcome = purchase::execute(&app_state, user.id, request).await?;
    Ok(respond(outcome))
}
