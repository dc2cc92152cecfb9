//! Travel request endpoints: create, fetch, list, update, and the
//! approve/cancel lifecycle transitions.
//!
//! Handlers stay thin. Each one loads state, asks the rule layer for a
//! decision, persists the outcome, and renders the wire envelope; every
//! refusal arrives as a typed error that [`ApiError`] maps to a status code.
//! Approve and cancel additionally hand a [`StatusChangeNotice`] to the
//! notification dispatcher after the transition is saved.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode as HttpStatus;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tripdesk_core::domain::status::{StatusCode, StatusRegistry};
use tripdesk_core::domain::travel_request::{
    format_wire_datetime, TravelRequest, TravelRequestDraft, TravelRequestId,
};
use tripdesk_core::errors::DomainError;
use tripdesk_core::notify::StatusChangeNotice;
use tripdesk_core::rules::{
    authorize_approve, authorize_cancel, authorize_create, authorize_update, authorize_view,
    list_scope, CreateAuthorization,
};
use tripdesk_core::validate::{
    validate_create, validate_filters, validate_update, CreateRequestInput, FilterInput,
    UpdateRequestInput,
};

use crate::auth::Caller;
use crate::bootstrap::AppState;
use crate::error::ApiError;

/// Wire shape of a travel request. Dates use the `YYYY-MM-DD HH:MM:SS`
/// format and `status` carries the display name from the status table.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelRequestEnvelope {
    pub id: i64,
    pub requester_id: i64,
    pub requester_name: String,
    pub destination: String,
    pub departure_date: String,
    pub return_date: String,
    pub status_code: &'static str,
    pub status: String,
}

fn render(
    request: &TravelRequest,
    registry: &StatusRegistry,
) -> Result<TravelRequestEnvelope, ApiError> {
    let status = registry
        .by_id(request.status_id)
        .ok_or(DomainError::UnknownStatus(request.status_id.0))?;

    Ok(TravelRequestEnvelope {
        id: request.id.0,
        requester_id: request.requester_id.0,
        requester_name: request.requester_name.clone(),
        destination: request.destination.clone(),
        departure_date: format_wire_datetime(&request.departure_date),
        return_date: format_wire_datetime(&request.return_date),
        status_code: status.code.code(),
        status: status.name.clone(),
    })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/travel-requests", get(list).post(create))
        .route("/travel-requests/{id}", get(fetch).put(update))
        .route("/travel-requests/{id}/approve", post(approve).patch(approve))
        .route("/travel-requests/{id}/cancel", post(cancel).patch(cancel))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateRequestBody {
    pub requester_id: Option<i64>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateRequestBody {
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status_code: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

async fn load(state: &AppState, id: i64) -> Result<TravelRequest, ApiError> {
    Ok(state
        .requests
        .find_by_id(&TravelRequestId(id))
        .await?
        .ok_or(DomainError::TravelRequestNotFound(id))?)
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<(HttpStatus, Json<TravelRequestEnvelope>), ApiError> {
    let Json(body) = body?;
    let input = validate_create(&CreateRequestInput {
        requester_id: body.requester_id,
        destination: body.destination,
        departure_date: body.departure_date,
        return_date: body.return_date,
    })?;

    let requester = match authorize_create(&caller.identity, input.requester_id)? {
        CreateAuthorization::SelfRequest => caller.identity.clone(),
        CreateAuthorization::OnBehalfOf(target) => state
            .users
            .find_by_id(&target)
            .await?
            .ok_or(DomainError::RequesterNotFound(target.0))?,
    };

    let requested = state.registry.require(StatusCode::Requested)?;
    let request = state
        .requests
        .create(TravelRequestDraft {
            requester_id: requester.id,
            requester_name: requester.name.clone(),
            destination: input.destination,
            departure_date: input.departure_date,
            return_date: input.return_date,
            status_id: requested.id,
        })
        .await?;

    info!(
        event_name = "travel_request.created",
        request_id = request.id.0,
        requester_id = request.requester_id.0,
        caller_id = caller.identity.id.0,
        "travel request created"
    );

    let envelope = render(&request, &state.registry)?;
    Ok((HttpStatus::CREATED, Json(envelope)))
}

pub async fn fetch(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<TravelRequestEnvelope>, ApiError> {
    let request = load(&state, id).await?;
    authorize_view(&caller.identity, &request)?;

    Ok(Json(render(&request, &state.registry)?))
}

pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TravelRequestEnvelope>>, ApiError> {
    let filters = validate_filters(&FilterInput {
        status_code: query.status_code,
        destination: query.destination,
        start_date: query.start_date,
        end_date: query.end_date,
    })?;

    let scope = list_scope(&caller.identity);
    let requests = state.requests.list(scope, &filters).await?;

    let envelopes = requests
        .iter()
        .map(|request| render(request, &state.registry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(envelopes))
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    body: Result<Json<UpdateRequestBody>, JsonRejection>,
) -> Result<Json<TravelRequestEnvelope>, ApiError> {
    let Json(body) = body?;
    let patch = validate_update(&UpdateRequestInput {
        destination: body.destination,
        departure_date: body.departure_date,
        return_date: body.return_date,
    })?;

    let mut request = load(&state, id).await?;
    let current = state.registry.code_of(request.status_id)?;
    authorize_update(&caller.identity, &request, current)?;

    if let Some(destination) = patch.destination {
        request.destination = destination;
    }
    if let Some(departure) = patch.departure_date {
        request.departure_date = departure;
    }
    if let Some(ret) = patch.return_date {
        request.return_date = ret;
    }
    request.updated_at = Utc::now();
    state.requests.update(&request).await?;

    info!(
        event_name = "travel_request.updated",
        request_id = request.id.0,
        caller_id = caller.identity.id.0,
        "travel request updated"
    );

    Ok(Json(render(&request, &state.registry)?))
}

pub async fn approve(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<TravelRequestEnvelope>, ApiError> {
    let mut request = load(&state, id).await?;
    let current = state.registry.code_of(request.status_id)?;
    authorize_approve(&caller.identity, current)?;

    let approved = state.registry.require(StatusCode::Approved)?;
    request.status_id = approved.id;
    request.updated_at = Utc::now();
    state.requests.update(&request).await?;

    info!(
        event_name = "travel_request.approved",
        request_id = request.id.0,
        approver_id = caller.identity.id.0,
        "travel request approved"
    );
    notify_requester(&state, &request, StatusCode::Approved).await;

    Ok(Json(render(&request, &state.registry)?))
}

pub async fn cancel(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<TravelRequestEnvelope>, ApiError> {
    let mut request = load(&state, id).await?;
    let current = state.registry.code_of(request.status_id)?;
    authorize_cancel(&caller.identity, &request, current)?;

    let cancelled = state.registry.require(StatusCode::Cancelled)?;
    request.status_id = cancelled.id;
    request.updated_at = Utc::now();
    state.requests.update(&request).await?;

    info!(
        event_name = "travel_request.cancelled",
        request_id = request.id.0,
        caller_id = caller.identity.id.0,
        "travel request cancelled"
    );
    notify_requester(&state, &request, StatusCode::Cancelled).await;

    Ok(Json(render(&request, &state.registry)?))
}

/// Post-transition side effect. The new status is already persisted, so a
/// failed requester lookup only costs the email, never the transition.
async fn notify_requester(state: &AppState, request: &TravelRequest, new_status: StatusCode) {
    match state.users.find_by_id(&request.requester_id).await {
        Ok(Some(requester)) => {
            state
                .notifier
                .dispatch(StatusChangeNotice::new(&requester, request, new_status))
                .await;
        }
        Ok(None) => {
            warn!(
                event_name = "travel_request.notify.skipped",
                request_id = request.id.0,
                requester_id = request.requester_id.0,
                "requester no longer resolves; skipping notification"
            );
        }
        Err(error) => {
            warn!(
                event_name = "travel_request.notify.skipped",
                request_id = request.id.0,
                error = %error,
                "requester lookup failed; skipping notification"
            );
        }
    }
}
