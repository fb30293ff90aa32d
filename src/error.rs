use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Everything that can end a request early. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("image exceeds the {limit} byte upload limit")]
    PayloadTooLarge { limit: usize },

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("could not determine the file type of the uploaded image")]
    UnknownFileType,

    #[error("{}", upstream_request_message(.status, .message))]
    UpstreamRequest {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("invalid response structure from external API: {0}")]
    UpstreamResponse(String),
}

fn upstream_request_message(status: &Option<StatusCode>, message: &str) -> String {
    match status {
        Some(status) => format!("external API request failed with status {}", status.as_u16()),
        None => format!("external API request failed: {message}"),
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Multipart(err) => err.status(),
            AppError::UnknownFileType
            | AppError::UpstreamRequest { .. }
            | AppError::UpstreamResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        AppError::UpstreamRequest {
            status: err.status().map(|s| StatusCode::from_u16(s.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)),
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            format!("An internal server error occurred: {self}")
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
