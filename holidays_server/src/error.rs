use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use holidays_core::Error as CoreError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::ExternalSource { .. }
                | CoreError::ExternalSourceMessage(_)
                | CoreError::ExternalRejected { .. } => StatusCode::BAD_GATEWAY,
                CoreError::Backend { .. } | CoreError::BackendMessage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let error = if code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "request failed with internal error");
            "internal server error".to_string()
        } else {
            tracing::debug!(status = %code, error = %self, "request rejected");
            self.to_string()
        };
        (code, Json(ErrorBody { error })).into_response()
    }
}
