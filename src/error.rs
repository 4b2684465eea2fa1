use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::courier::CourierId;
use crate::models::order::OrderId;

/// Which bulk registration endpoint rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Couriers,
    Orders,
}

impl RegistrationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationKind::Couriers => "couriers",
            RegistrationKind::Orders => "orders",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("courier {0} not found")]
    CourierNotFound(CourierId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {order_id} is not assigned to courier {courier_id}")]
    OwnershipMismatch {
        courier_id: CourierId,
        order_id: OrderId,
    },

    #[error("order {0} is already completed")]
    AlreadyCompleted(OrderId),

    #[error("invalid attributes: {0}")]
    InvalidAttributes(String),

    #[error("{} registration rejected for ids {ids:?}", .kind.as_str())]
    RegistrationRejected {
        kind: RegistrationKind,
        ids: Vec<u64>,
    },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Conflict and StoreUnavailable leave no trace and may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_) | AppError::StoreUnavailable(_))
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::CourierNotFound(_) | AppError::OrderNotFound(_) => "not_found",
            AppError::OwnershipMismatch { .. } => "ownership_mismatch",
            AppError::AlreadyCompleted(_) => "already_completed",
            AppError::InvalidAttributes(_) => "invalid_attributes",
            AppError::RegistrationRejected { .. } => "registration_rejected",
            AppError::BadRequest(_) => "bad_request",
            AppError::Conflict(_) => "conflict",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::CourierNotFound(_) | AppError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            AppError::OwnershipMismatch { .. } => StatusCode::FORBIDDEN,
            AppError::AlreadyCompleted(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidAttributes(_)
            | AppError::RegistrationRejected { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::RegistrationRejected { kind, ids } => {
                let ids: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
                let mut rejected = serde_json::Map::new();
                rejected.insert(kind.as_str().to_string(), json!(ids));
                Json(json!({ "validation_error": rejected }))
            }
            _ => Json(json!({
                "error": self.to_string(),
                "retryable": self.is_retryable(),
            })),
        };

        (status, body).into_response()
    }
}
