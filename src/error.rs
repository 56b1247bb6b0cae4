// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::PollError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("admin token required")]
    AdminOnly,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Poll(PollError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Poll(PollError::VotingClosed) => StatusCode::FORBIDDEN,
            AppError::Poll(
                PollError::InvalidChoice | PollError::InvalidWindow | PollError::InvalidText,
            ) => StatusCode::BAD_REQUEST,
            AppError::Poll(PollError::Store(e)) => {
                error!("Store failure: {e}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response();
            }
            AppError::AdminOnly => StatusCode::UNAUTHORIZED,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
