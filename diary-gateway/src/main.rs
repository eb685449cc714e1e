//! Diary gateway: links chat identities to web accounts and mediates
//! note operations from both surfaces through one authorization boundary.

mod auth;
mod bot;
mod config;
mod db;
mod error;
mod link;
mod notes_api;
mod routes;
mod telegram;
#[cfg(test)]
mod testutil;

use auth::HttpTokenVerifier;
use bot::BotRouter;
use config::Config;
use db::Db;
use link::LinkGateway;
use notes_api::{NotesApi, NotesApiClient};
use routes::AppState;
use std::sync::Arc;
use telegram::{ChatTransport, TelegramTransport};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    log::info!("Opening link store at {}", config.database_path);
    let db = Arc::new(Db::open(&config.database_path).expect("Failed to open link store"));

    let notes: Arc<dyn NotesApi> = Arc::new(NotesApiClient::new(
        &config.notes_service_url,
        &config.internal_api_secret,
    ));
    let telegram = Arc::new(TelegramTransport::new(&config.telegram_bot_token));
    let transport: Arc<dyn ChatTransport> = telegram.clone();

    let links = Arc::new(LinkGateway::new(
        db.clone(),
        notes.clone(),
        transport.clone(),
    ));
    let bot_router = Arc::new(BotRouter::new(
        links.clone(),
        notes.clone(),
        transport.clone(),
        &config.web_app_url,
    ));

    tokio::spawn(telegram::run_polling(telegram, bot_router));

    let state = Arc::new(AppState {
        links,
        notes,
        transport,
        verifier: Arc::new(HttpTokenVerifier::new(&config.identity_verify_url)),
        internal_secret: config.internal_api_secret.clone(),
    });
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    log::info!("Diary gateway listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
