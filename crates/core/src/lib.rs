pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod rules;
pub mod validate;

pub use config::{
    AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, MailTransportKind,
};
pub use domain::status::{StatusCode, StatusId, StatusRegistry, TravelStatus};
pub use domain::travel_request::{
    ListScope, RequestFilters, TravelRequest, TravelRequestDraft, TravelRequestId,
    TravelRequestPatch,
};
pub use domain::user::{Identity, Role, UserId};
pub use errors::DomainError;
pub use notify::{
    NoopNotificationDispatcher, NotificationDispatcher, RecordingNotificationDispatcher,
    StatusChangeNotice,
};
pub use rules::{CreateAuthorization, TravelRequestDenial};
pub use validate::{
    CreateRequestInput, FilterInput, LoginInput, RegisterInput, UpdateRequestInput,
    ValidationErrors,
};
