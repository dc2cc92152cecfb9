use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::status::{StatusCode, StatusId};
use crate::domain::user::UserId;

/// Wire format for departure/return timestamps, shared by payload parsing
/// and response rendering.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wire format for the calendar-date list filters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_wire_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).ok()
}

pub fn format_wire_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TravelRequestId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelRequest {
    pub id: TravelRequestId,
    /// Owning identity, set exactly once at creation. No operation
    /// reassigns ownership.
    pub requester_id: UserId,
    /// Display-name snapshot taken when the request was created; never
    /// re-synced against the user directory.
    pub requester_name: String,
    pub destination: String,
    pub departure_date: NaiveDateTime,
    pub return_date: NaiveDateTime,
    /// Mutable only through the approve/cancel operations.
    pub status_id: StatusId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields persisted on creation. The status id and requester identity are
/// filled in by the create operation itself; client payloads carry neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TravelRequestDraft {
    pub requester_id: UserId,
    pub requester_name: String,
    pub destination: String,
    pub departure_date: NaiveDateTime,
    pub return_date: NaiveDateTime,
    pub status_id: StatusId,
}

/// Field edits accepted by update. Status is structurally absent: the only
/// way to change it is a lifecycle transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TravelRequestPatch {
    pub destination: Option<String>,
    pub departure_date: Option<NaiveDateTime>,
    pub return_date: Option<NaiveDateTime>,
}

impl TravelRequestPatch {
    pub fn is_empty(&self) -> bool {
        self.destination.is_none() && self.departure_date.is_none() && self.return_date.is_none()
    }
}

/// Visibility boundary for list queries. Non-admin callers only ever see
/// their own rows, regardless of the filters they supply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListScope {
    All,
    OwnedBy(UserId),
}

/// Optional narrowing criteria for list queries. Every bound is an
/// independent AND condition; an absent bound never narrows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilters {
    pub status_code: Option<StatusCode>,
    /// Exact, case-sensitive match.
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RequestFilters {
    pub fn is_empty(&self) -> bool {
        self.status_code.is_none()
            && self.destination.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    /// Lower bound on departure: the filter date at 00:00:00.
    pub fn departure_floor(&self) -> Option<NaiveDateTime> {
        self.start_date.map(|date| date.and_time(NaiveTime::MIN))
    }

    /// Upper bound on return: the filter date at 23:59:59.
    pub fn return_ceiling(&self) -> Option<NaiveDateTime> {
        self.end_date.and_then(|date| date.and_hms_opt(23, 59, 59))
    }

    /// Date/destination predicate shared by the in-memory store. The status
    /// bound compares codes, so the caller resolves this row's code first.
    pub fn matches(&self, request: &TravelRequest, status: StatusCode) -> bool {
        if let Some(wanted) = self.status_code {
            if status != wanted {
                return false;
            }
        }

        if let Some(destination) = &self.destination {
            if &request.destination != destination {
                return false;
            }
        }

        if let Some(floor) = self.departure_floor() {
            if request.departure_date < floor {
                return false;
            }
        }

        if let Some(ceiling) = self.return_ceiling() {
            if request.return_date > ceiling {
                return false;
            }
        }

        true
    }
}
