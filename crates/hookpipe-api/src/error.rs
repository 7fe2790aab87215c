//! API error handling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API error type. Bodies are plain text; 401 carries no internal detail.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
        .into_response()
    }
}

impl From<hookpipe_core::Error> for ApiError {
    fn from(err: hookpipe_core::Error) -> Self {
        match err {
            hookpipe_core::Error::Unauthorized => ApiError::Unauthorized,
            hookpipe_core::Error::ExecutionInProgress => {
                ApiError::Conflict("Pipeline already running".to_string())
            }
            other => ApiError::Internal(format!("Error executing pipeline: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookpipe_core::Error;

    #[test]
    fn test_core_errors_map_to_api_variants() {
        assert!(matches!(
            ApiError::from(Error::Unauthorized),
            ApiError::Unauthorized
        ));

        match ApiError::from(Error::ExecutionInProgress) {
            ApiError::Conflict(msg) => assert_eq!(msg, "Pipeline already running"),
            other => panic!("expected Conflict, got {:?}", other),
        }

        match ApiError::from(Error::StepFailed {
            step: "deploy".to_string(),
            exit_code: 2,
        }) {
            ApiError::Internal(msg) => {
                assert!(msg.starts_with("Error executing pipeline:"), "{}", msg);
                assert!(msg.contains("deploy"), "{}", msg);
            }
            other => panic!("expected Internal, got {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_response_carries_no_detail() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
