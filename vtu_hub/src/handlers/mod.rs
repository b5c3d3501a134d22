mod admin;
mod auth;
mod purchases;
mod transactions;
mod validate;
mod wallet;
mod webhook;

use actix_web::{HttpResponse, Responder, get};

pub use admin::*;
pub use auth::*;
pub use purchases::*;
pub use transactions::*;
pub use validate::*;
pub use wallet::*;
pub use webhook::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Welcome to VTU Hub Service!")
}
