use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::models::order::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    ReceiptMissing,
    SafetyNotConfirmed,
    FundsNotConfirmed,
}

impl Gate {
    pub fn message(self) -> &'static str {
        match self {
            Gate::ReceiptMissing => "a purchase receipt must be attached first",
            Gate::SafetyNotConfirmed => "load safety must be confirmed first",
            Gate::FundsNotConfirmed => "till funds must be confirmed first",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Unauthorized(String),

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order already taken by another driver")]
    AlreadyClaimed,

    #[error("till funds already confirmed for this order")]
    AlreadyConfirmed,

    #[error("issue already resolved")]
    AlreadyResolved,

    #[error("{}", .0.message())]
    GateUnmet(Gate),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::AlreadyClaimed => (StatusCode::CONFLICT, self.to_string()),
            AppError::AlreadyConfirmed => (StatusCode::CONFLICT, self.to_string()),
            AppError::AlreadyResolved => (StatusCode::CONFLICT, self.to_string()),
            AppError::GateUnmet(gate) => {
                (StatusCode::PRECONDITION_FAILED, gate.message().to_string())
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = match &self {
            AppError::GateUnmet(gate) => Json(json!({
                "error": message,
                "gate": gate,
            })),
            _ => Json(json!({
                "error": message
            })),
        };

        (status, body).into_response()
    }
}
