//! API error taxonomy and HTTP status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gizmo_flight::ClientError;
use gizmo_session::SessionError;
use serde_json::json;

/// The four failure kinds the API distinguishes. Message text, remote or
/// local, is passed to the caller verbatim.
#[derive(Debug)]
pub enum ApiError {
    /// Caller error: a required field is missing or empty.
    InvalidRequest(String),
    /// Unknown or expired session id.
    SessionNotFound(String),
    /// Remote connect/auth/transport failure.
    Connection(String),
    /// Remote execution failure.
    Query(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Connection(_) | ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::InvalidRequest(msg)
            | ApiError::SessionNotFound(msg)
            | ApiError::Connection(msg)
            | ApiError::Query(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        ApiError::SessionNotFound(e.to_string())
    }
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        match &e {
            ClientError::Connect(_) => ApiError::Connection(e.to_string()),
            ClientError::Query(_) | ClientError::Decode(_) => ApiError::Query(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::InvalidRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::SessionNotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Connection("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Query("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_error_kinds_map_to_api_kinds() {
        let err: ApiError = ClientError::Connect("refused".into()).into();
        assert!(matches!(err, ApiError::Connection(_)));

        let err: ApiError = ClientError::Query("bad sql".into()).into();
        assert!(matches!(err, ApiError::Query(_)));
    }
}
