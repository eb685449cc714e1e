//! Client for the remote note store service.
//!
//! Every request carries the shared internal secret; the remote side is
//! responsible for ownership checks on delete. Transient failures map to a
//! single upstream-unavailable error and are never retried here, since a
//! silent retry could double-create a note.

use crate::error::GatewayError;
use async_trait::async_trait;
use diary_types::{Note, derive_title};
use serde::Serialize;
use std::time::Duration;

pub const INTERNAL_SECRET_HEADER: &str = "X-Internal-Secret";

#[async_trait]
pub trait NotesApi: Send + Sync {
    /// Notes owned by `user_id`, most recent first, capped at `limit`.
    async fn list(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<Note>, GatewayError>;

    /// Creates a note with a derived title preview.
    async fn create(&self, user_id: &str, text: &str) -> Result<Note, GatewayError>;

    /// Deletes by id; the remote store enforces ownership and reports
    /// "not found" and "not owned" identically.
    async fn delete(&self, user_id: &str, note_id: i64) -> Result<(), GatewayError>;

    /// Advisory sync of the chat binding into the note store's user
    /// registry. Callers log failures and move on.
    async fn sync_chat_id(&self, user_id: &str, chat_id: &str) -> Result<(), GatewayError>;
}

pub struct NotesApiClient {
    client: reqwest::Client,
    base_url: String,
    secret: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateNoteBody<'a> {
    title: &'a str,
    content: &'a str,
    user_id: &'a str,
}

#[derive(Serialize)]
struct SyncChatIdBody<'a> {
    user_uid: &'a str,
    chat_id: &'a str,
}

impl NotesApiClient {
    pub fn new(base_url: &str, secret: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create notes API client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A rejected internal secret is fatal to the call, not transient.
    /// The delete path handles its ownership 403 before reaching here, so
    /// a 403 at this point can only mean the secret itself was refused.
    fn map_error_status(status: reqwest::StatusCode) -> GatewayError {
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            GatewayError::InvalidCredential
        } else {
            GatewayError::UpstreamUnavailable
        }
    }

    fn map_transport_error(context: &str, e: reqwest::Error) -> GatewayError {
        log::error!("Notes API {} failed: {}", context, e);
        GatewayError::UpstreamUnavailable
    }
}

#[async_trait]
impl NotesApi for NotesApiClient {
    async fn list(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<Note>, GatewayError> {
        let mut query: Vec<(&str, String)> = vec![("userId", user_id.to_string())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .client
            .get(self.url("/notes"))
            .header(INTERNAL_SECRET_HEADER, &self.secret)
            .query(&query)
            .send()
            .await
            .map_err(|e| Self::map_transport_error("list", e))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Notes API list returned {}", status);
            return Err(Self::map_error_status(status));
        }

        response
            .json::<Vec<Note>>()
            .await
            .map_err(|e| Self::map_transport_error("list decode", e))
    }

    async fn create(&self, user_id: &str, text: &str) -> Result<Note, GatewayError> {
        if text.trim().is_empty() {
            return Err(GatewayError::Validation("Note text is required.".to_string()));
        }

        let title = derive_title(text);
        let body = CreateNoteBody {
            title: &title,
            content: text,
            user_id,
        };

        let response = self
            .client
            .post(self.url("/notes"))
            .header(INTERNAL_SECRET_HEADER, &self.secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_transport_error("create", e))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Notes API create returned {}", status);
            return Err(Self::map_error_status(status));
        }

        response
            .json::<Note>()
            .await
            .map_err(|e| Self::map_transport_error("create decode", e))
    }

    async fn delete(&self, user_id: &str, note_id: i64) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.url(&format!("/notes/{}", note_id)))
            .header(INTERNAL_SECRET_HEADER, &self.secret)
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(|e| Self::map_transport_error("delete", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == reqwest::StatusCode::NOT_FOUND
            || status == reqwest::StatusCode::FORBIDDEN
        {
            // Missing and not-owned come back as one uniform failure.
            Err(GatewayError::NotFoundOrForbidden)
        } else {
            log::error!("Notes API delete returned {}", status);
            Err(Self::map_error_status(status))
        }
    }

    async fn sync_chat_id(&self, user_id: &str, chat_id: &str) -> Result<(), GatewayError> {
        let body = SyncChatIdBody {
            user_uid: user_id,
            chat_id,
        };

        let response = self
            .client
            .post(self.url("/users/chat_id"))
            .header(INTERNAL_SECRET_HEADER, &self.secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_transport_error("sync_chat_id", e))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Notes API sync_chat_id returned {}", status);
            return Err(Self::map_error_status(status));
        }
        Ok(())
    }
}
