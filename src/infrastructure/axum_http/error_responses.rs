use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Error body shared by every endpoint. `code` carries machine-readable
/// error identifiers (provider decline codes, INSUFFICIENT_COUNT).
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    code: Option<&str>,
) -> Response {
    let body = Json(ErrorBody {
        success: false,
        error: message.into(),
        code: code.map(|code| code.to_string()),
    });

    (status, body).into_response()
}
