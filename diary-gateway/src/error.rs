//! Error taxonomy shared by the chat router and the web API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use diary_types::ErrorBody;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No end-user credential was presented.
    Unauthenticated,
    /// A credential was presented but rejected by the verifier.
    InvalidCredential,
    /// The chat identity has no account binding; recoverable via /connect.
    NotLinked,
    /// The note store or identity verifier did not answer usefully.
    UpstreamUnavailable,
    /// The note does not exist or belongs to someone else; the two cases
    /// are indistinguishable on purpose.
    NotFoundOrForbidden,
    Validation(String),
    Storage(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Unauthenticated => write!(f, "no credential provided"),
            GatewayError::InvalidCredential => write!(f, "credential rejected"),
            GatewayError::NotLinked => write!(f, "chat is not linked to an account"),
            GatewayError::UpstreamUnavailable => write!(f, "upstream service unavailable"),
            GatewayError::NotFoundOrForbidden => write!(f, "note not found or not owned"),
            GatewayError::Validation(msg) => write!(f, "validation failed: {}", msg),
            GatewayError::Storage(msg) => write!(f, "storage failure: {}", msg),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GatewayError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized: no token provided.".to_string(),
            ),
            GatewayError::InvalidCredential => (
                StatusCode::FORBIDDEN,
                "Unauthorized: invalid token.".to_string(),
            ),
            GatewayError::NotLinked => (
                StatusCode::BAD_REQUEST,
                "Chat is not linked to an account.".to_string(),
            ),
            GatewayError::UpstreamUnavailable => (
                StatusCode::BAD_GATEWAY,
                "Note service is unavailable. Please try again later.".to_string(),
            ),
            GatewayError::NotFoundOrForbidden => {
                (StatusCode::NOT_FOUND, "Note not found.".to_string())
            }
            GatewayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::Storage(detail) => {
                // Internal detail goes to the log, never to the client.
                log::error!("Storage failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GatewayError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (GatewayError::InvalidCredential, StatusCode::FORBIDDEN),
            (GatewayError::NotLinked, StatusCode::BAD_REQUEST),
            (GatewayError::UpstreamUnavailable, StatusCode::BAD_GATEWAY),
            (GatewayError::NotFoundOrForbidden, StatusCode::NOT_FOUND),
            (
                GatewayError::Validation("text is required".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::Storage("disk on fire".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
