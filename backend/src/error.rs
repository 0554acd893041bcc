//! Error handling for the inventory ledger
//!
//! Workflows return structured errors; the HTTP layer maps them to status
//! codes and a uniform JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use shared::{AllocationShortfall, FieldError, Shortage, StockKey};
use thiserror::Error;

use crate::cache::CacheError;

/// Postgres SQLSTATE codes that mean "another transaction got there first"
const LOCK_NOT_AVAILABLE: &str = "55P03";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed with {} error(s)", errors.len())]
    Validation { errors: Vec<FieldError> },

    #[error("Insufficient inventory for {} item(s)", shortages.len())]
    InsufficientInventory { shortages: Vec<Shortage> },

    #[error("Conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Persistence(sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        AppError::Validation { errors }
    }

    pub fn field(field: &str, code: &str, message: &str) -> Self {
        AppError::Validation {
            errors: vec![FieldError::new(field, code, message)],
        }
    }

    pub fn insufficient(shortage: Shortage) -> Self {
        AppError::InsufficientInventory {
            shortages: vec![shortage],
        }
    }

    /// Allocation ran out of batches for `key`
    pub fn from_shortfall(key: StockKey, shortfall: AllocationShortfall) -> Self {
        Self::insufficient(Shortage::new(
            key.product_id,
            key.location_id,
            shortfall.allocatable,
            shortfall.required,
        ))
    }

    /// Stock under active reservations cannot be counted or adjusted away
    pub fn reserved_stock(key: StockKey, reserved: i64) -> Self {
        AppError::Conflict {
            resource: "inventory_balance".to_string(),
            message: format!(
                "{reserved} units of product {} at location {} are reserved; \
                 release the reservations before reducing stock below that",
                key.product_id, key.location_id
            ),
        }
    }

    /// Arithmetic on request quantities or amounts left the representable range
    pub fn out_of_range(field: &str) -> Self {
        Self::field(field, "range", "value is too large to record")
    }

    pub fn busy(resource: &str) -> Self {
        AppError::Conflict {
            resource: resource.to_string(),
            message: "timed out waiting for a concurrent operation; retry the request".to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Persistence(_) => "DATABASE_ERROR",
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::InsufficientInventory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(LOCK_NOT_AVAILABLE) => AppError::busy("inventory_balances"),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => AppError::Conflict {
                    resource: "inventory_balances".to_string(),
                    message: "concurrent modification detected; retry the request".to_string(),
                },
                _ => AppError::Persistence(err),
            },
            sqlx::Error::PoolTimedOut => AppError::busy("database"),
            _ => AppError::Persistence(err),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, details) = match &self {
            AppError::Validation { errors } => (self.to_string(), Some(json!(errors))),
            AppError::InsufficientInventory { shortages } => {
                (self.to_string(), Some(json!(shortages)))
            }
            AppError::Conflict { resource, message } => {
                (message.clone(), Some(json!({ "resource": resource })))
            }
            AppError::NotFound(_) => (self.to_string(), None),
            // Store and cache internals stay in the log
            AppError::Persistence(_) => ("A database error occurred".to_string(), None),
            AppError::Cache(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                ("An internal server error occurred".to_string(), None)
            }
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::field("items", "length", "required").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("Product".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::busy("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::insufficient(Shortage::new(Uuid::nil(), Uuid::nil(), 20, 25)).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_shortfall_becomes_shortage() {
        let key = StockKey::new(Uuid::from_u128(1), Uuid::from_u128(2));
        let err = AppError::from_shortfall(
            key,
            AllocationShortfall {
                required: 25,
                allocatable: 20,
                shortage: 5,
            },
        );
        match err {
            AppError::InsufficientInventory { shortages } => {
                assert_eq!(shortages.len(), 1);
                assert_eq!(shortages[0].available, 20);
                assert_eq!(shortages[0].required, 25);
                assert_eq!(shortages[0].shortage, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_pool_timeout_is_a_conflict() {
        assert!(matches!(
            AppError::from(sqlx::Error::PoolTimedOut),
            AppError::Conflict { .. }
        ));
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::Persistence(_)
        ));
    }
}
