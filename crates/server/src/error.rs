//! HTTP mapping for every failure the handlers can surface.
//!
//! The rule layer raises typed errors with stable messages; this module owns
//! the translation to status codes and response bodies. Storage faults are
//! redacted to generic messages unless the `debug` config flag is set.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use tripdesk_core::errors::DomainError;
use tripdesk_core::rules::TravelRequestDenial;
use tripdesk_core::validate::ValidationErrors;
use tripdesk_db::repositories::RepositoryError;

/// Authentication refusals, one stable message per cause. The message never
/// distinguishes a revoked token from an unknown one.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AuthRefusal {
    #[error("token not found")]
    TokenMissing,
    #[error("invalid or expired token")]
    TokenInvalid,
    #[error("user not authenticated")]
    UserUnresolved,
    #[error("invalid credentials")]
    BadCredentials,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Unauthenticated(#[from] AuthRefusal),
    #[error(transparent)]
    Denied(#[from] TravelRequestDenial),
    #[error("administrator access required")]
    AdminOnly,
    #[error("{0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Seeded reference data is incomplete or a stored row points outside
    /// it. Always a server fault, never caller input.
    #[error(transparent)]
    Configuration(DomainError),
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Denied(denial) => Self::Denied(denial),
            DomainError::Validation(errors) => Self::Validation(errors),
            DomainError::TravelRequestNotFound(id) => {
                Self::NotFound(format!("travel request {id} not found"))
            }
            DomainError::RequesterNotFound(id) => {
                Self::NotFound(format!("requesting user {id} not found"))
            }
            error @ (DomainError::MissingStatus(_) | DomainError::UnknownStatus(_)) => {
                Self::Configuration(error)
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push("payload", rejection.body_text());
        Self::Validation(errors)
    }
}

static DEBUG_RESPONSES: AtomicBool = AtomicBool::new(false);

/// Bootstrap flips this on when `debug = true` so 4xx/5xx storage responses
/// carry the raw error text instead of the generic message.
pub fn expose_error_detail(enabled: bool) {
    DEBUG_RESPONSES.store(enabled, Ordering::Relaxed);
}

fn detail_or(generic: &str, detail: String) -> String {
    if DEBUG_RESPONSES.load(Ordering::Relaxed) {
        detail
    } else {
        generic.to_string()
    }
}

fn plain(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn is_constraint_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => {
            db_error.is_unique_violation()
                || db_error.is_foreign_key_violation()
                || db_error.is_check_violation()
        }
        _ => false,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated(refusal) => {
                plain(StatusCode::UNAUTHORIZED, refusal.to_string())
            }
            Self::Denied(denial) => plain(StatusCode::FORBIDDEN, denial.to_string()),
            Self::AdminOnly => {
                plain(StatusCode::FORBIDDEN, "administrator access required".to_string())
            }
            Self::NotFound(message) => plain(StatusCode::NOT_FOUND, message),
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "validation failed", "errors": errors.into_fields() })),
            )
                .into_response(),
            Self::Repository(RepositoryError::Database(db_error))
                if is_constraint_violation(&db_error) =>
            {
                warn!(error = %db_error, "request rejected by a database constraint");
                plain(
                    StatusCode::BAD_REQUEST,
                    detail_or("invalid reference or duplicate value", db_error.to_string()),
                )
            }
            Self::Repository(repository_error) => {
                error!(error = %repository_error, "storage failure while handling a request");
                plain(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    detail_or("unexpected database error", repository_error.to_string()),
                )
            }
            Self::Configuration(domain_error) => {
                error!(error = %domain_error, "status registry defect surfaced at request time");
                plain(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    detail_or("internal configuration error", domain_error.to_string()),
                )
            }
        }
    }
}

/// Fallback handler: every unrouted path gets the 404 envelope instead of an
/// empty body.
pub async fn unknown_route() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}
