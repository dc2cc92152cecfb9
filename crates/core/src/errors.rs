use thiserror::Error;

use crate::rules::TravelRequestDenial;
use crate::validate::ValidationErrors;

/// Typed failures raised by the rule layer. The HTTP adapter owns the
/// mapping to status codes; nothing here knows about transport.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Denied(#[from] TravelRequestDenial),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("travel request {0} not found")]
    TravelRequestNotFound(i64),
    #[error("requesting user {0} not found")]
    RequesterNotFound(i64),
    /// A well-known lifecycle code is absent from the seeded status table.
    /// This is a deployment defect, never bad user input.
    #[error("status registry is missing lifecycle code `{0}`")]
    MissingStatus(&'static str),
    /// A stored row points at a status id the registry does not know.
    #[error("travel request references unknown status id {0}")]
    UnknownStatus(i64),
}

impl DomainError {
    /// Configuration defects must surface as server faults, not as caller
    /// mistakes.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingStatus(_) | Self::UnknownStatus(_))
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
