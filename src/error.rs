// src/error.rs
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::slot::SlotError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("record {0} already exists")]
    Duplicate(String),
}

impl StoreError {
    /// A stored record that does not decode will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Encoding(_))
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error("poll {0} not found")]
    NotFound(String),

    #[error("poll {poll_id} kept changing underneath us, gave up after {attempts} attempts")]
    ConcurrentUpdateConflict { poll_id: String, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PollError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Slot(SlotError::InvalidTimeZone(_)) => "invalid_time_zone",
            Self::Slot(SlotError::UnalignedSlot(_)) => "unaligned_slot",
            Self::Slot(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::ConcurrentUpdateConflict { .. } => "conflict",
            Self::Store(StoreError::Encoding(_)) => "corrupt_record",
            Self::Store(_) => "store_unavailable",
        }
    }

    /// Whether the caller should try again later with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConcurrentUpdateConflict { .. } => true,
            Self::Store(err) => err.is_transient(),
            _ => false,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Slot(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ConcurrentUpdateConflict { .. } => StatusCode::CONFLICT,
            Self::Store(StoreError::Encoding(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "retryable": self.is_retryable(),
        }));
        (status, body).into_response()
    }
}

pub type PollResult<T> = Result<T, PollError>;
