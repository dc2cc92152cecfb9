use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusId(pub i64);

/// Lifecycle states keyed by their short wire code. Codes are compared
/// exactly; no case normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Requested,
    Approved,
    Cancelled,
}

impl StatusCode {
    pub const ALL: [StatusCode; 3] = [Self::Requested, Self::Approved, Self::Cancelled];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Requested => "S",
            Self::Approved => "A",
            Self::Cancelled => "C",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Approved => "Approved",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "S" => Some(Self::Requested),
            "A" => Some(Self::Approved),
            "C" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: StatusCode) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Approved) | (Self::Approved, Self::Cancelled)
        )
    }
}

/// One seeded row of the status reference table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelStatus {
    pub id: StatusId,
    pub code: StatusCode,
    pub name: String,
}

/// Immutable view of the seeded status table, resolved once at startup.
///
/// A missing well-known code is a seeding/deployment defect, so lookups
/// return a configuration error that callers surface loudly instead of
/// skipping the transition.
#[derive(Clone, Debug, Default)]
pub struct StatusRegistry {
    statuses: Vec<TravelStatus>,
}

impl StatusRegistry {
    pub fn new(statuses: Vec<TravelStatus>) -> Self {
        Self { statuses }
    }

    pub fn find(&self, code: StatusCode) -> Option<&TravelStatus> {
        self.statuses.iter().find(|status| status.code == code)
    }

    pub fn require(&self, code: StatusCode) -> Result<&TravelStatus, DomainError> {
        self.find(code).ok_or(DomainError::MissingStatus(code.code()))
    }

    pub fn by_id(&self, id: StatusId) -> Option<&TravelStatus> {
        self.statuses.iter().find(|status| status.id == id)
    }

    /// Resolves a stored foreign key back to its lifecycle code. An unknown
    /// id means the row predates the registry or the seed is corrupt.
    pub fn code_of(&self, id: StatusId) -> Result<StatusCode, DomainError> {
        self.by_id(id).map(|status| status.code).ok_or(DomainError::UnknownStatus(id.0))
    }

    /// Startup gate: every lifecycle code must be present before the
    /// application serves traffic.
    pub fn verify_complete(&self) -> Result<(), DomainError> {
        for code in StatusCode::ALL {
            self.require(code)?;
        }
        Ok(())
    }
}
