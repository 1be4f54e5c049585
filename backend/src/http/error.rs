//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::services::TopologyError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional structured details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Engine error
    Topology(TopologyError),
    /// Caller lacks a capability
    Forbidden(String),
    /// Invalid request
    BadRequest(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Topology(e) => match e {
                TopologyError::NotFound { .. } => StatusCode::NOT_FOUND,
                TopologyError::NoValidCandidates { .. } | TopologyError::Validation { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                TopologyError::Conflict { .. } => StatusCode::CONFLICT,
                TopologyError::TransactionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn topology_body(err: &TopologyError) -> ApiError {
    let body = ApiError::new(err.code(), err.to_string());
    match err {
        TopologyError::NotFound { entity, id } => {
            body.with_details(json!({ "entity": entity, "id": id }))
        }
        TopologyError::NoValidCandidates {
            sector,
            reason,
            rejected,
        } => body.with_details(json!({
            "sector": sector,
            "reason": reason,
            "rejected": rejected,
        })),
        TopologyError::Validation { field, .. } => body.with_details(json!({ "field": field })),
        TopologyError::Conflict { .. } => body,
        // Store internals stay in the logs
        TopologyError::TransactionFailed { .. } => {
            ApiError::new(err.code(), "Transaction failed and was rolled back")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            AppError::Topology(e) => {
                if status.is_server_error() {
                    warn!("Request failed: {}", e);
                }
                topology_body(e)
            }
            AppError::Forbidden(msg) => ApiError::new("FORBIDDEN", msg.clone()),
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => ApiError::new("INTERNAL_ERROR", msg.clone()),
        };

        (status, Json(error)).into_response()
    }
}

impl From<TopologyError> for AppError {
    fn from(err: TopologyError) -> Self {
        AppError::Topology(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
