use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use examiner_core::ExaminerError;
use serde::{Deserialize, Serialize};

/// JSON error body. `detail` is the field the web client reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] ExaminerError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("unsupported content type '{0}' (expected application/json or multipart/form-data)")]
    UnsupportedMediaType(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Core(err) => match err {
                ExaminerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ExaminerError::ModelCallFailed(_)
                | ExaminerError::ModelOutputMalformed(_)
                | ExaminerError::RubricUnavailable(_)
                | ExaminerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    /// Message for the response body. Validation messages are passed through
    /// verbatim so clients can show them as-is.
    fn detail(&self) -> String {
        match self {
            ApiError::Core(ExaminerError::InvalidInput(msg)) | ApiError::InvalidInput(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if code.is_server_error() {
            tracing::error!(status = code.as_u16(), error = %self, "request failed");
        }
        let body = ErrorBody {
            detail: self.detail(),
        };
        (code, Json(body)).into_response()
    }
}
