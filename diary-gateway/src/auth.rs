//! Bearer-token authentication for the web API.

use crate::error::GatewayError;
use crate::routes::AppState;
use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies a bearer token and returns the account id it belongs to.
    async fn verify(&self, token: &str) -> Result<String, GatewayError>;
}

/// Verifies tokens against the identity provider's validate endpoint.
pub struct HttpTokenVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpTokenVerifier {
    pub fn new(verify_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create token verifier client");
        Self {
            client,
            verify_url: verify_url.to_string(),
        }
    }
}

#[derive(Serialize)]
struct VerifyTokenRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct VerifyTokenResponse {
    valid: bool,
    #[serde(default)]
    user_id: Option<String>,
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&VerifyTokenRequest { token })
            .send()
            .await
            .map_err(|e| {
                log::error!("Token verification request failed: {}", e);
                GatewayError::UpstreamUnavailable
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::InvalidCredential);
        }
        if !status.is_success() {
            log::error!("Token verification returned {}", status);
            return Err(GatewayError::UpstreamUnavailable);
        }

        let body: VerifyTokenResponse = response.json().await.map_err(|e| {
            log::error!("Token verification returned unparsable body: {}", e);
            GatewayError::UpstreamUnavailable
        })?;

        match body {
            VerifyTokenResponse {
                valid: true,
                user_id: Some(user_id),
            } => Ok(user_id),
            _ => Err(GatewayError::InvalidCredential),
        }
    }
}

/// The account identity attached to a request after bearer verification.
#[derive(Debug, Clone)]
pub struct AuthedAccount(pub String);

/// Rejects requests without a verifiable `Authorization: Bearer` header
/// before any handler runs.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(GatewayError::Unauthenticated)?;

    let account_id = state.verifier.verify(&token).await?;
    req.extensions_mut().insert(AuthedAccount(account_id));
    Ok(next.run(req).await)
}
