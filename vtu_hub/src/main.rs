mod config;
mod handlers;
mod purchase;
mod reconcile;
mod state;
#[cfg(test)]
mod testutil;

use actix_jwt_auth_middleware::{Authority, TokenSigner, use_jwt::UseJWTOnApp};
use actix_state_guards::UseStateGuardOnScope;
use actix_web::{
    App, HttpServer, error::InternalError, http::StatusCode, middleware::Logger, web,
};
use common::User;
use dotenv::dotenv;
use ed25519_compact::KeyPair;
use jwt_compact::alg::Ed25519;
use pretty_env_logger::env_logger::{Builder, Env};

use crate::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    if cli::run_cli().await {
        return Ok(());
    }

    let logger_env = Env::default().default_filter_or("debug");
    let mut logger_builder = Builder::from_env(logger_env);
    logger_builder.init();

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let state = config.create_app_state().await.map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    log::info!("App state initialized successfully");

    let data = web::Data::new(state);

    // Spawn the refund retry worker
    {
        let runner_state = data.clone();
        tokio::spawn(async move {
            state::start_refund_worker(runner_state).await;
        });
    }

    //Authorization
    let KeyPair {
        pk: public_key,
        sk: secret_key,
    } = KeyPair::generate();

    let bind_addr = config.bind_addr.clone();
    log::info!("Starting server on {bind_addr}");

    HttpServer::new(move || {
        let authority = Authority::<User, Ed25519, _, _>::new()
            .refresh_authorizer(|| async move { Ok(()) })
            .token_signer(Some(
                TokenSigner::new()
                    .signing_key(secret_key.clone())
                    .algorithm(Ed25519)
                    .build()
                    .expect("Failed to generate TokenSigner"),
            ))
            .verifying_key(public_key)
            .build()
            .expect("Failed to create Authority");

        App::new()
            .app_data(data.clone())
            .wrap(Logger::new("%a %t %r %s  %{Referer}i %Dms"))
            .service(handlers::login)
            .service(handlers::provider_webhook)
            .use_jwt(
                authority,
                web::scope("")
                    .service(handlers::index)
                    .service(handlers::my_wallet)
                    .service(handlers::topup_wallet)
                    .service(handlers::buy_airtime)
                    .service(handlers::buy_data)
                    .service(handlers::subscribe_cable)
                    .service(handlers::pay_electricity)
                    .service(handlers::buy_education)
                    .service(handlers::validate_meter)
                    .service(handlers::validate_cable)
                    .service(handlers::get_transactions)
                    .service(handlers::requery_transaction)
                    .service(handlers::get_transaction_by_id)
                    .use_state_guard(
                        |user: User| async move {
                            if user.is_superuser {
                                Ok(())
                            } else {
                                Err(InternalError::new(
                                    "You are not an Admin",
                                    StatusCode::UNAUTHORIZED,
                                ))
                            }
                        },
                        web::scope("/admin")
                            .service(handlers::list_users)
                            .service(handlers::list_wallets)
                            .service(handlers::list_all_transactions)
                            .service(handlers::list_topups)
                            .service(handlers::record_topup)
                            .service(handlers::provider_balance),
                    ),
            )
    })
    .bind(bind_addr.as_str())?
    .run()
    .await
}
