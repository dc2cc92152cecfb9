use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::travel_request::{
    parse_wire_date, parse_wire_datetime, RequestFilters, TravelRequestPatch,
};
use crate::domain::status::StatusCode;
use crate::domain::user::UserId;

pub const DESTINATION_MAX_LEN: usize = 255;
pub const NAME_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Field-keyed validation failures, accumulated so a caller sees every
/// problem in one response rather than one per round trip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn into_fields(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Raw create payload before any checking. Dates stay strings until the
/// format check has run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateRequestInput {
    pub requester_id: Option<i64>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
}

/// Create payload with every field checked. The target requester stays
/// optional here: whether it is acceptable is an authorization question,
/// not a shape question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedCreate {
    pub requester_id: Option<UserId>,
    pub destination: String,
    pub departure_date: chrono::NaiveDateTime,
    pub return_date: chrono::NaiveDateTime,
}

pub fn validate_create(input: &CreateRequestInput) -> Result<ValidatedCreate, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let destination = check_destination(&mut errors, input.destination.as_deref(), true);
    let departure = check_datetime(&mut errors, "departure_date", input.departure_date.as_deref(), true);
    let ret = check_datetime(&mut errors, "return_date", input.return_date.as_deref(), true);
    check_date_order(&mut errors, departure, ret);

    errors.into_result()?;

    // Required checks above guarantee these are Some once into_result passes.
    Ok(ValidatedCreate {
        requester_id: input.requester_id.map(UserId),
        destination: destination.unwrap_or_default(),
        departure_date: departure.unwrap_or_default(),
        return_date: ret.unwrap_or_default(),
    })
}

/// Raw update payload. Every field is optional; present fields must still
/// be well-formed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateRequestInput {
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
}

pub fn validate_update(input: &UpdateRequestInput) -> Result<TravelRequestPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let destination = check_destination(&mut errors, input.destination.as_deref(), false);
    let departure = check_datetime(&mut errors, "departure_date", input.departure_date.as_deref(), false);
    let ret = check_datetime(&mut errors, "return_date", input.return_date.as_deref(), false);
    // Ordering is only checkable when the payload carries both bounds; a
    // single-sided edit is accepted as-is.
    check_date_order(&mut errors, departure, ret);

    errors.into_result()?;

    Ok(TravelRequestPatch { destination, departure_date: departure, return_date: ret })
}

/// Raw list-filter query values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub status_code: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub fn validate_filters(input: &FilterInput) -> Result<RequestFilters, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let status_code = match input.status_code.as_deref() {
        None => None,
        Some(raw) => match StatusCode::parse(raw) {
            Some(code) => Some(code),
            None => {
                errors.push("status_code", "must be one of S, A, C");
                None
            }
        },
    };

    let destination = match input.destination.as_deref() {
        Some(value) if value.chars().count() > DESTINATION_MAX_LEN => {
            errors.push("destination", format!("must be at most {DESTINATION_MAX_LEN} characters"));
            None
        }
        Some(value) => Some(value.to_string()),
        None => None,
    };

    let start_date = check_date(&mut errors, "start_date", input.start_date.as_deref());
    let end_date = check_date(&mut errors, "end_date", input.end_date.as_deref());

    errors.into_result()?;

    Ok(RequestFilters { status_code, destination, start_date, end_date })
}

/// Raw registration payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub fn validate_registration(
    input: &RegisterInput,
) -> Result<ValidatedRegistration, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = match input.name.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push("name", "is required");
            None
        }
        Some(value) if value.chars().count() > NAME_MAX_LEN => {
            errors.push("name", format!("must be at most {NAME_MAX_LEN} characters"));
            None
        }
        Some(value) => Some(value.to_string()),
    };

    let email = match input.email.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push("email", "is required");
            None
        }
        Some(value) if !is_plausible_email(value) => {
            errors.push("email", "must be a valid email address");
            None
        }
        Some(value) => Some(value.to_string()),
    };

    let password = match input.password.as_deref() {
        None | Some("") => {
            errors.push("password", "is required");
            None
        }
        Some(value) if value.chars().count() < PASSWORD_MIN_LEN => {
            errors.push("password", format!("must be at least {PASSWORD_MIN_LEN} characters"));
            None
        }
        Some(value) => Some(value.to_string()),
    };

    errors.into_result()?;

    Ok(ValidatedRegistration {
        name: name.unwrap_or_default(),
        email: email.unwrap_or_default(),
        password: password.unwrap_or_default(),
    })
}

/// Raw login payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedLogin {
    pub email: String,
    pub password: String,
}

pub fn validate_login(input: &LoginInput) -> Result<ValidatedLogin, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let email = match input.email.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push("email", "is required");
            None
        }
        Some(value) => Some(value.to_string()),
    };

    let password = match input.password.as_deref() {
        None | Some("") => {
            errors.push("password", "is required");
            None
        }
        Some(value) => Some(value.to_string()),
    };

    errors.into_result()?;

    Ok(ValidatedLogin { email: email.unwrap_or_default(), password: password.unwrap_or_default() })
}

fn check_destination(
    errors: &mut ValidationErrors,
    value: Option<&str>,
    required: bool,
) -> Option<String> {
    match value.map(str::trim) {
        None => {
            if required {
                errors.push("destination", "is required");
            }
            None
        }
        Some("") => {
            errors.push("destination", "must not be empty");
            None
        }
        Some(value) if value.chars().count() > DESTINATION_MAX_LEN => {
            errors.push("destination", format!("must be at most {DESTINATION_MAX_LEN} characters"));
            None
        }
        Some(value) => Some(value.to_string()),
    }
}

fn check_datetime(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    required: bool,
) -> Option<chrono::NaiveDateTime> {
    match value {
        None => {
            if required {
                errors.push(field, "is required");
            }
            None
        }
        Some(raw) => match parse_wire_datetime(raw) {
            Some(parsed) => Some(parsed),
            None => {
                errors.push(field, "must match the format YYYY-MM-DD HH:MM:SS");
                None
            }
        },
    }
}

fn check_date(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
) -> Option<chrono::NaiveDate> {
    match value {
        None => None,
        Some(raw) => match parse_wire_date(raw) {
            Some(parsed) => Some(parsed),
            None => {
                errors.push(field, "must match the format YYYY-MM-DD");
                None
            }
        },
    }
}

fn check_date_order(
    errors: &mut ValidationErrors,
    departure: Option<chrono::NaiveDateTime>,
    ret: Option<chrono::NaiveDateTime>,
) {
    if let (Some(departure), Some(ret)) = (departure, ret) {
        if ret < departure {
            errors.push("return_date", "must be on or after the departure date");
        }
    }
}

fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && domain.contains('.') && !value.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::{
        validate_create, validate_filters, validate_login, validate_registration, validate_update,
        CreateRequestInput, FilterInput, LoginInput, RegisterInput, UpdateRequestInput,
    };
    use crate::domain::status::StatusCode;
    use crate::domain::user::UserId;

    fn create_input() -> CreateRequestInput {
        CreateRequestInput {
            requester_id: Some(7),
            destination: Some("Paris".into()),
            departure_date: Some("2025-09-01 10:00:00".into()),
            return_date: Some("2025-09-05 18:00:00".into()),
        }
    }

    #[test]
    fn accepts_a_complete_create_payload() {
        let validated = validate_create(&create_input()).expect("valid payload");
        assert_eq!(validated.requester_id, Some(UserId(7)));
        assert_eq!(validated.destination, "Paris");
    }

    #[test]
    fn rejects_missing_required_create_fields_with_field_detail() {
        let errors = validate_create(&CreateRequestInput::default()).expect_err("empty payload");
        let fields = errors.fields();
        assert!(fields.contains_key("destination"));
        assert!(fields.contains_key("departure_date"));
        assert!(fields.contains_key("return_date"));
    }

    #[test]
    fn rejects_blank_and_overlong_destination() {
        let mut input = create_input();
        input.destination = Some("   ".into());
        let errors = validate_create(&input).expect_err("blank destination");
        assert_eq!(errors.fields()["destination"], vec!["must not be empty".to_string()]);

        input.destination = Some("x".repeat(256));
        let errors = validate_create(&input).expect_err("overlong destination");
        assert!(errors.fields()["destination"][0].contains("255"));
    }

    #[test]
    fn rejects_return_before_departure() {
        let mut input = create_input();
        input.departure_date = Some("2025-09-05 18:00:00".into());
        input.return_date = Some("2025-09-01 10:00:00".into());

        let errors = validate_create(&input).expect_err("inverted dates");
        assert_eq!(
            errors.fields()["return_date"],
            vec!["must be on or after the departure date".to_string()]
        );
    }

    #[test]
    fn accepts_return_equal_to_departure() {
        let mut input = create_input();
        input.departure_date = Some("2025-09-01 10:00:00".into());
        input.return_date = Some("2025-09-01 10:00:00".into());
        assert!(validate_create(&input).is_ok());
    }

    #[test]
    fn rejects_malformed_datetime_with_format_hint() {
        let mut input = create_input();
        input.departure_date = Some("2025-09-01T10:00:00".into());
        let errors = validate_create(&input).expect_err("iso form is not the wire form");
        assert!(errors.fields()["departure_date"][0].contains("YYYY-MM-DD HH:MM:SS"));
    }

    #[test]
    fn update_accepts_single_sided_edits() {
        let patch = validate_update(&UpdateRequestInput {
            destination: Some("Berlin".into()),
            ..UpdateRequestInput::default()
        })
        .expect("partial edit");

        assert_eq!(patch.destination.as_deref(), Some("Berlin"));
        assert!(patch.departure_date.is_none());
        assert!(patch.return_date.is_none());
    }

    #[test]
    fn update_checks_ordering_when_both_dates_present() {
        let errors = validate_update(&UpdateRequestInput {
            departure_date: Some("2025-09-05 18:00:00".into()),
            return_date: Some("2025-09-01 10:00:00".into()),
            ..UpdateRequestInput::default()
        })
        .expect_err("inverted dates");

        assert!(errors.fields().contains_key("return_date"));
    }

    #[test]
    fn empty_update_is_a_valid_noop_patch() {
        let patch = validate_update(&UpdateRequestInput::default()).expect("no fields");
        assert!(patch.is_empty());
    }

    #[test]
    fn filters_parse_status_code_and_dates() {
        let filters = validate_filters(&FilterInput {
            status_code: Some("A".into()),
            destination: Some("Paris".into()),
            start_date: Some("2025-09-01".into()),
            end_date: Some("2025-09-05".into()),
        })
        .expect("valid filters");

        assert_eq!(filters.status_code, Some(StatusCode::Approved));
        assert_eq!(filters.destination.as_deref(), Some("Paris"));
        assert!(filters.start_date.is_some());
        assert!(filters.end_date.is_some());
    }

    #[test]
    fn filters_reject_unknown_status_code_value() {
        let errors = validate_filters(&FilterInput {
            status_code: Some("X".into()),
            ..FilterInput::default()
        })
        .expect_err("unknown code");

        assert_eq!(errors.fields()["status_code"], vec!["must be one of S, A, C".to_string()]);
    }

    #[test]
    fn filters_reject_lowercase_status_code() {
        let errors = validate_filters(&FilterInput {
            status_code: Some("a".into()),
            ..FilterInput::default()
        })
        .expect_err("codes are exact");

        assert!(errors.fields().contains_key("status_code"));
    }

    #[test]
    fn absent_filters_validate_to_the_empty_filter_set() {
        let filters = validate_filters(&FilterInput::default()).expect("no filters");
        assert!(filters.is_empty());
    }

    #[test]
    fn registration_requires_name_email_and_password() {
        let errors = validate_registration(&RegisterInput::default()).expect_err("empty");
        assert!(errors.fields().contains_key("name"));
        assert!(errors.fields().contains_key("email"));
        assert!(errors.fields().contains_key("password"));
    }

    #[test]
    fn registration_rejects_implausible_email_and_short_password() {
        let errors = validate_registration(&RegisterInput {
            name: Some("Dana".into()),
            email: Some("not-an-email".into()),
            password: Some("short".into()),
        })
        .expect_err("bad email and password");

        assert!(errors.fields().contains_key("email"));
        assert!(errors.fields().contains_key("password"));
        assert!(!errors.fields().contains_key("name"));
    }

    #[test]
    fn login_requires_both_credentials() {
        let errors = validate_login(&LoginInput { email: Some("dana@example.com".into()), password: None })
            .expect_err("missing password");
        assert!(errors.fields().contains_key("password"));
        assert!(!errors.fields().contains_key("email"));

        let validated = validate_login(&LoginInput {
            email: Some("dana@example.com".into()),
            password: Some("hunter2hunter2".into()),
        })
        .expect("complete credentials");
        assert_eq!(validated.email, "dana@example.com");
    }
}
