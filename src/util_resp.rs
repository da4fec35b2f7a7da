use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::UploadError;

pub type StandardResponse<T> = Result<Json<T>, FailureResponse>;

pub fn bad_request<T>(message: impl Into<String>) -> StandardResponse<T> {
    Err(FailureResponse::BadRequest(message.into()))
}

#[derive(Debug)]
pub enum FailureResponse {
    BadRequest(String),
    Conflict(String),
    PayloadTooLarge(String),
    ServerError(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            FailureResponse::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            FailureResponse::Conflict(msg) => (StatusCode::CONFLICT, msg),
            FailureResponse::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, msg)
            }
            FailureResponse::ServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<UploadError> for FailureResponse {
    fn from(e: UploadError) -> Self {
        let message = e.to_string();
        match e {
            UploadError::MissingFile
            | UploadError::Workbook(_)
            | UploadError::Parse(_) => FailureResponse::BadRequest(message),
            UploadError::DuplicateRound { .. } => {
                FailureResponse::Conflict(message)
            }
            UploadError::FileTooLarge { .. } => {
                FailureResponse::PayloadTooLarge(message)
            }
            UploadError::Database(_) | UploadError::Pool(_) => {
                tracing::error!(%message, "Upload failed");
                FailureResponse::ServerError(message)
            }
        }
    }
}
