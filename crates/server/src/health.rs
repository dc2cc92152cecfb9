use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::error;
use tripdesk_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub checked_at: String,
}

/// Carries its own state so it can merge into the API router after that
/// router has been sealed with the application state.
pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/healthz", get(healthz)).with_state(HealthState { db_pool })
}

pub async fn healthz(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database == "ok";

    let payload = HealthResponse {
        status: if ready { "ok" } else { "degraded" },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> &'static str {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => "ok",
        Err(error) => {
            error!(
                event_name = "system.health.degraded",
                error = %error,
                "health probe failed to reach the database"
            );
            "unreachable"
        }
    }
}
