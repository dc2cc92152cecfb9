//! Cookie-token authentication.
//!
//! Endpoints:
//! - `POST /login`   — verify credentials, issue a session, set the cookie
//! - `POST /logout`  — revoke the presented session, clear the cookie
//! - `POST /refresh` — rotate the presented session, re-set the cookie
//! - `GET  /profile` — return the caller identity
//!
//! Sessions are server-side rows keyed by an opaque token; the token only
//! ever travels inside an HTTP-only cookie. Protected handlers take the
//! [`Caller`] extractor, which resolves the cookie back to an [`Identity`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::header::{HeaderName, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use tripdesk_core::config::AuthConfig;
use tripdesk_core::domain::user::{Identity, UserId};
use tripdesk_core::validate::{validate_login, LoginInput};
use tripdesk_db::repositories::{Session, UserCredentials};

use crate::bootstrap::AppState;
use crate::error::{ApiError, AuthRefusal};
use crate::users::{render_user, UserEnvelope};

/// Runtime view of the `[auth]` config section.
#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub session_ttl_secs: u64,
}

impl AuthSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            cookie_secure: config.cookie_secure,
            session_ttl_secs: config.session_ttl_secs,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs.min(i64::MAX as u64) as i64)
    }

    fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, self.session_ttl_secs as i64)
    }

    /// Max-Age=0 tells the client to drop the cookie immediately.
    fn clearing_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax",
            self.cookie_name
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Hex digest of `salt || password`, the stored verifier format.
pub fn hash_password(salt: &str, password: &str) -> String {
    let digest = Sha256::digest(format!("{salt}{password}"));
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Eight random bytes, hex encoded.
pub fn generate_salt() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn verify_password(stored: &UserCredentials, password: &str) -> bool {
    hash_password(&stored.password_salt, password) == stored.password_hash
}

fn new_session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Verified caller identity plus the presented token, so logout and refresh
/// revoke exactly the session that authenticated the call.
#[derive(Clone, Debug)]
pub struct Caller {
    pub identity: Identity,
    pub token: String,
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            cookie_value(parts, &state.auth.cookie_name).ok_or(AuthRefusal::TokenMissing)?;
        let identity = resolve_token(state, &token).await?;

        Ok(Self { identity, token })
    }
}

/// Find the named cookie across however many Cookie headers the client sent.
fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

async fn resolve_token(state: &AppState, token: &str) -> Result<Identity, ApiError> {
    let session =
        state.sessions.find_by_token(token).await?.ok_or(AuthRefusal::TokenInvalid)?;

    if session.is_expired(Utc::now()) {
        // Reap lazily; login prunes the rest in bulk.
        if let Err(error) = state.sessions.delete(token).await {
            warn!(error = %error, "failed to drop an expired session");
        }
        return Err(AuthRefusal::TokenInvalid.into());
    }

    state
        .users
        .find_by_id(&session.user_id)
        .await?
        .ok_or(ApiError::Unauthenticated(AuthRefusal::UserUnresolved))
}

async fn issue_session(state: &AppState, user_id: UserId) -> Result<Session, ApiError> {
    let now = Utc::now();
    let session = Session {
        token: new_session_token(),
        user_id,
        created_at: now,
        expires_at: now + state.auth.ttl(),
    };
    state.sessions.insert(&session).await?;

    Ok(session)
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/profile", get(profile))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Session metadata returned by login and refresh. The token itself only
/// travels in the cookie.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token_type: &'static str,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    pub message: &'static str,
}

type SetCookie = [(HeaderName, String); 1];

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<(SetCookie, Json<SessionResponse>), ApiError> {
    let Json(body) = body?;
    let credentials =
        validate_login(&LoginInput { email: body.email, password: body.password })?;

    // Housekeeping that never blocks a login.
    if let Err(error) = state.sessions.delete_expired(Utc::now()).await {
        warn!(error = %error, "failed to prune expired sessions");
    }

    let stored = state
        .users
        .find_by_email(&credentials.email)
        .await?
        .ok_or(AuthRefusal::BadCredentials)?;

    if !verify_password(&stored, &credentials.password) {
        return Err(AuthRefusal::BadCredentials.into());
    }

    let session = issue_session(&state, stored.identity.id).await?;
    info!(event_name = "auth.login", user_id = stored.identity.id.0, "session issued");

    Ok((
        [(SET_COOKIE, state.auth.session_cookie(&session.token))],
        Json(SessionResponse { token_type: "bearer", expires_in: state.auth.session_ttl_secs }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<(SetCookie, Json<ConfirmationResponse>), ApiError> {
    state.sessions.delete(&caller.token).await?;
    info!(event_name = "auth.logout", user_id = caller.identity.id.0, "session revoked");

    Ok((
        [(SET_COOKIE, state.auth.clearing_cookie())],
        Json(ConfirmationResponse { message: "logged out" }),
    ))
}

pub async fn refresh(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<(SetCookie, Json<SessionResponse>), ApiError> {
    // Rotation: the old token dies the moment the new one exists.
    state.sessions.delete(&caller.token).await?;
    let session = issue_session(&state, caller.identity.id).await?;
    info!(event_name = "auth.refresh", user_id = caller.identity.id.0, "session rotated");

    Ok((
        [(SET_COOKIE, state.auth.session_cookie(&session.token))],
        Json(SessionResponse { token_type: "bearer", expires_in: state.auth.session_ttl_secs }),
    ))
}

pub async fn profile(caller: Caller) -> Json<UserEnvelope> {
    Json(render_user(&caller.identity))
}
