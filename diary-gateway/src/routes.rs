//! Axum route handlers for the web API surface.

use crate::auth::{self, AuthedAccount, TokenVerifier};
use crate::error::GatewayError;
use crate::link::LinkGateway;
use crate::notes_api::{INTERNAL_SECRET_HEADER, NotesApi};
use crate::telegram::ChatTransport;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router, middleware};
use diary_types::{
    CreateNoteRequest, LinkAccountRequest, MessageResponse, Note, SendReminderRequest,
};
use std::sync::Arc;

pub struct AppState {
    pub links: Arc<LinkGateway>,
    pub notes: Arc<dyn NotesApi>,
    pub transport: Arc<dyn ChatTransport>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub internal_secret: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/notes/:id", delete(delete_note))
        .route("/api/link-account", post(link_account))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .merge(protected)
        .route("/api/send-reminder", post(send_reminder))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

// GET /api/notes
async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(AuthedAccount(account_id)): Extension<AuthedAccount>,
) -> Result<Json<Vec<Note>>, GatewayError> {
    let notes = state.notes.list(&account_id, None).await?;
    Ok(Json(notes))
}

// POST /api/notes
async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthedAccount(account_id)): Extension<AuthedAccount>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), GatewayError> {
    let note = state.notes.create(&account_id, &req.text).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

// DELETE /api/notes/{id}; ownership is enforced by the remote store.
async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(AuthedAccount(account_id)): Extension<AuthedAccount>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, GatewayError> {
    state.notes.delete(&account_id, id).await?;
    Ok(Json(MessageResponse::new("Note deleted.")))
}

// POST /api/link-account
async fn link_account(
    State(state): State<Arc<AppState>>,
    Extension(AuthedAccount(account_id)): Extension<AuthedAccount>,
    Json(req): Json<LinkAccountRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let chat_id = req.chat_id.as_deref().unwrap_or("");
    state.links.link_account(&account_id, chat_id).await?;
    Ok(Json(MessageResponse::new("Account linked.")))
}

// POST /api/send-reminder: trusted-caller-only side channel, guarded by
// the shared internal secret instead of a bearer token.
async fn send_reminder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SendReminderRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let secret = headers
        .get(INTERNAL_SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(GatewayError::Unauthenticated)?;
    if secret != state.internal_secret {
        log::warn!("send-reminder called with a bad internal secret");
        return Err(GatewayError::Unauthenticated);
    }

    state.transport.send_message(&req.chat_id, &req.message).await?;
    Ok(Json(MessageResponse::new("Reminder sent.")))
}
