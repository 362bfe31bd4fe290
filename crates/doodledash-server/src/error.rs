use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::room_manager::JoinError;

/// REST-surface errors, rendered as JSON `{"error": msg}` bodies.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    #[allow(dead_code)]
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(m) | Self::NotFound(m) | Self::Internal(m) => {
                write!(f, "{m}")
            },
        }
    }
}

impl From<JoinError> for AppError {
    fn from(e: JoinError) -> Self {
        match e {
            JoinError::RoomNotFound => Self::NotFound(e.to_string()),
            JoinError::RoomFull => Self::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_errors_map_to_http_classes() {
        assert!(matches!(
            AppError::from(JoinError::RoomNotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(JoinError::RoomFull),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn display_passes_message_through() {
        let e = AppError::BadRequest("username required".to_string());
        assert_eq!(e.to_string(), "username required");
    }
}
