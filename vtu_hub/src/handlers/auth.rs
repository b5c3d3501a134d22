use crate::state::AppState;
use actix_jwt_auth_middleware::TokenSigner;
use actix_web::Error;
use actix_web::{HttpResponse, error::InternalError, http::StatusCode, post, web};
use common::User;
use jwt_compact::alg::Ed25519;

#[derive(Debug, serde::Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

#[post("/login")]
pub async fn login(
    login_data: web::Json<LoginData>,
    app_state: web::Data<AppState>,
    cookie_signer: web::Data<TokenSigner<User, Ed25519>>,
) -> Result<HttpResponse, Error> {
    let user = app_state
        .db
        .get_user_by_email(&login_data.email)
        .await
        .map_err(|err| {
            log::error!("Failed to look up user {}: {:?}", login_data.email, err);
            InternalError::new("Login failed", StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| {
            log::warn!("Login attempt for unknown email: {}", login_data.email);
            InternalError::new("Invalid email or password", StatusCode::UNAUTHORIZED)
        })?;

    if let Err(err) = user.verify_password(&login_data.password) {
        log::warn!("Invalid password for user {}: {:?}", login_data.email, err);
        return Ok(HttpResponse::Unauthorized().body("Invalid email or password"));
    }

    let access_cookie = cookie_signer.create_access_cookie(&user).map_err(|err| {
        log::error!("Failed to create access token: {:?}", err);
        InternalError::new("Token error", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let refresh_cookie = cookie_signer.create_refresh_cookie(&user).map_err(|err| {
        log::error!("Failed to create refresh token: {:?}", err);
        InternalError::new("Token error", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .body("Login successful."))
}
