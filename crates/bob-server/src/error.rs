//! エラー → HTTP ステータス

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bob_job::{JobError, WebhookError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Job(e) => match e {
                JobError::InvalidSpec(_) => StatusCode::PRECONDITION_FAILED,
                JobError::NotFound(_) => StatusCode::NOT_FOUND,
                JobError::Workdir(_) => StatusCode::INTERNAL_SERVER_ERROR,
                JobError::Fetch(_)
                | JobError::Parse(_)
                | JobError::Build(_)
                | JobError::Aborted(_) => StatusCode::EXPECTATION_FAILED,
            },
            ApiError::Webhook(e) => match e {
                WebhookError::UnsupportedEvent(_) | WebhookError::Malformed(_) => {
                    StatusCode::BAD_REQUEST
                }
                WebhookError::Conflict(_) => StatusCode::CONFLICT,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        match self {
            ApiError::Unauthorized => (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"bob\"")],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
