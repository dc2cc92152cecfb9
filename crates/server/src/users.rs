//! Public account registration and the admin-only user directory.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use tripdesk_core::domain::user::{Identity, Role, UserId};
use tripdesk_core::validate::{validate_registration, RegisterInput, ValidationErrors};
use tripdesk_db::repositories::NewUser;

use crate::auth::{generate_salt, hash_password, Caller};
use crate::bootstrap::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: &'static str,
}

pub fn render_user(identity: &Identity) -> UserEnvelope {
    UserEnvelope {
        id: identity.id.0,
        name: identity.name.clone(),
        email: identity.email.clone(),
        role: identity.role.as_str(),
    }
}

fn require_admin(caller: &Caller) -> Result<(), ApiError> {
    if caller.identity.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::AdminOnly)
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/users", get(list))
        .route("/users/{id}", get(fetch))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let Json(body) = body?;
    let registration = validate_registration(&RegisterInput {
        name: body.name,
        email: body.email,
        password: body.password,
    })?;

    // Racing duplicates still land on the UNIQUE index.
    if state.users.find_by_email(&registration.email).await?.is_some() {
        let mut errors = ValidationErrors::new();
        errors.push("email", "is already registered");
        return Err(errors.into());
    }

    let salt = generate_salt();
    let account = state
        .users
        .create(NewUser {
            name: registration.name,
            email: registration.email,
            password_hash: hash_password(&salt, &registration.password),
            password_salt: salt,
            // Never caller-assignable.
            role: Role::User,
        })
        .await?;

    info!(event_name = "user.registered", user_id = account.id.0, "account created");

    Ok((StatusCode::CREATED, Json(render_user(&account))))
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<UserEnvelope>>, ApiError> {
    require_admin(&caller)?;
    let users = state.users.list().await?;

    Ok(Json(users.iter().map(render_user).collect()))
}

pub async fn fetch(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<UserEnvelope>, ApiError> {
    require_admin(&caller)?;
    let identity = state
        .users
        .find_by_id(&UserId(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;

    Ok(Json(render_user(&identity)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::Json;

    use tripdesk_core::domain::user::{Identity, Role, UserId};
    use tripdesk_core::notify::NoopNotificationDispatcher;
    use tripdesk_db::repositories::{
        seeded_registry, InMemorySessionRepository, InMemoryTravelRequestRepository,
        InMemoryUserRepository, UserRepository,
    };

    use super::{fetch, list, register, RegisterBody};
    use crate::auth::{hash_password, AuthSettings, Caller};
    use crate::bootstrap::AppState;
    use crate::error::ApiError;

    fn test_state() -> AppState {
        AppState {
            requests: Arc::new(InMemoryTravelRequestRepository::default()),
            users: Arc::new(InMemoryUserRepository::default()),
            sessions: Arc::new(InMemorySessionRepository::default()),
            registry: Arc::new(seeded_registry()),
            notifier: Arc::new(NoopNotificationDispatcher),
            auth: AuthSettings {
                cookie_name: "tripdesk_token".to_string(),
                cookie_secure: false,
                session_ttl_secs: 3_600,
            },
        }
    }

    fn caller(role: Role) -> Caller {
        Caller {
            identity: Identity {
                id: UserId(1),
                name: "Avery".to_string(),
                email: "avery@example.test".to_string(),
                role,
            },
            token: "test-token".to_string(),
        }
    }

    fn body(name: &str, email: &str, password: &str) -> RegisterBody {
        RegisterBody {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn registration_creates_a_user_role_account() {
        let state = test_state();

        let (status, Json(envelope)) = register(
            State(state.clone()),
            Ok(Json(body("Dana", "dana@example.test", "first-trip-2026"))),
        )
        .await
        .expect("register");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(envelope.name, "Dana");
        assert_eq!(envelope.email, "dana@example.test");
        assert_eq!(envelope.role, "user");

        let stored = state
            .users
            .find_by_email("dana@example.test")
            .await
            .expect("lookup")
            .expect("account exists");
        assert_eq!(
            stored.password_hash,
            hash_password(&stored.password_salt, "first-trip-2026")
        );
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_failure() {
        let state = test_state();

        register(
            State(state.clone()),
            Ok(Json(body("Dana", "dana@example.test", "first-trip-2026"))),
        )
        .await
        .expect("first registration");

        let error = register(
            State(state),
            Ok(Json(body("Imposter", "dana@example.test", "second-trip-2026"))),
        )
        .await
        .expect_err("duplicate email");

        assert!(matches!(error, ApiError::Validation(_)));
        assert!(error.to_string().contains("is already registered"));
    }

    #[tokio::test]
    async fn short_passwords_are_rejected_with_field_detail() {
        let state = test_state();

        let error = register(State(state), Ok(Json(body("Dana", "dana@example.test", "short"))))
            .await
            .expect_err("short password");

        match error {
            ApiError::Validation(errors) => {
                assert!(errors.fields().contains_key("password"));
            }
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_users_requires_the_admin_role() {
        let state = test_state();
        register(
            State(state.clone()),
            Ok(Json(body("Dana", "dana@example.test", "first-trip-2026"))),
        )
        .await
        .expect("register");

        let denied = list(State(state.clone()), caller(Role::User))
            .await
            .expect_err("plain users cannot list accounts");
        assert!(matches!(denied, ApiError::AdminOnly));

        let Json(users) = list(State(state), caller(Role::Admin)).await.expect("admin list");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "dana@example.test");
    }

    #[tokio::test]
    async fn fetching_a_user_requires_the_admin_role() {
        let state = test_state();

        let (_, Json(created)) = register(
            State(state.clone()),
            Ok(Json(body("Dana", "dana@example.test", "first-trip-2026"))),
        )
        .await
        .expect("register");

        let denied = fetch(State(state.clone()), caller(Role::User), Path(created.id))
            .await
            .expect_err("plain users cannot read the directory");
        assert!(matches!(denied, ApiError::AdminOnly));

        let Json(found) = fetch(State(state.clone()), caller(Role::Admin), Path(created.id))
            .await
            .expect("admin fetch");
        assert_eq!(found.email, "dana@example.test");

        let missing = fetch(State(state), caller(Role::Admin), Path(9_999))
            .await
            .expect_err("unknown id");
        assert!(matches!(missing, ApiError::NotFound(_)));
        assert_eq!(missing.to_string(), "user 9999 not found");
    }
}
