//! Authorization and lifecycle rules for travel requests.
//!
//! Every function here is a pure decision over already-loaded state: the
//! caller identity arrives as an explicit argument and the current lifecycle
//! code is resolved by the orchestrating layer before the check runs. The
//! store, the user directory, and the notification dispatcher are invoked
//! by that orchestration only after a decision allows it.

use thiserror::Error;

use crate::domain::status::StatusCode;
use crate::domain::travel_request::{ListScope, TravelRequest};
use crate::domain::user::{Identity, UserId};

/// Rule-specific refusals. The message text is caller-facing and stable;
/// the HTTP layer maps every variant to 403.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TravelRequestDenial {
    #[error("not authorized to create a travel request for another user")]
    CreateForAnotherUser,
    #[error("not authorized to view this request")]
    ViewNotAllowed,
    #[error("not authorized to manage this request")]
    ManageNotAllowed,
    #[error("cannot edit an approved request")]
    EditApproved,
    #[error("cannot edit a cancelled request")]
    EditCancelled,
    #[error("only administrators can approve travel requests")]
    ApproveRequiresAdmin,
    #[error("travel request is already approved")]
    AlreadyApproved,
    #[error("cannot approve a cancelled request")]
    ApproveCancelled,
    #[error("can only cancel an approved request")]
    CancelRequiresApproved,
    #[error("not authorized to cancel this request")]
    CancelNotAllowed,
}

/// How an allowed create resolves its requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateAuthorization {
    /// The caller files for themselves; their own name is snapshotted.
    SelfRequest,
    /// An administrator files on behalf of the target, which must resolve
    /// in the user directory before anything persists.
    OnBehalfOf(UserId),
}

/// Admins may target anyone (including themselves — the target identity is
/// still resolved through the directory). Everyone else must name exactly
/// their own id; an absent target is refused the same way as a foreign one.
pub fn authorize_create(
    caller: &Identity,
    target: Option<UserId>,
) -> Result<CreateAuthorization, TravelRequestDenial> {
    match target {
        Some(target) if caller.role.is_admin() => Ok(CreateAuthorization::OnBehalfOf(target)),
        Some(target) if target == caller.id => Ok(CreateAuthorization::SelfRequest),
        _ => Err(TravelRequestDenial::CreateForAnotherUser),
    }
}

pub fn authorize_view(
    caller: &Identity,
    request: &TravelRequest,
) -> Result<(), TravelRequestDenial> {
    if !caller.role.is_admin() && request.requester_id != caller.id {
        return Err(TravelRequestDenial::ViewNotAllowed);
    }
    Ok(())
}

/// Ownership is checked before the lifecycle state, so a stranger probing a
/// finished request learns nothing beyond "not yours".
pub fn authorize_update(
    caller: &Identity,
    request: &TravelRequest,
    current: StatusCode,
) -> Result<(), TravelRequestDenial> {
    if !caller.role.is_admin() && request.requester_id != caller.id {
        return Err(TravelRequestDenial::ManageNotAllowed);
    }

    match current {
        StatusCode::Approved => Err(TravelRequestDenial::EditApproved),
        StatusCode::Cancelled => Err(TravelRequestDenial::EditCancelled),
        StatusCode::Requested => Ok(()),
    }
}

pub fn authorize_approve(
    caller: &Identity,
    current: StatusCode,
) -> Result<(), TravelRequestDenial> {
    if !caller.role.is_admin() {
        return Err(TravelRequestDenial::ApproveRequiresAdmin);
    }

    if current == StatusCode::Approved {
        return Err(TravelRequestDenial::AlreadyApproved);
    }

    if !current.can_transition_to(StatusCode::Approved) {
        return Err(TravelRequestDenial::ApproveCancelled);
    }

    Ok(())
}

/// The state precondition outranks ownership here: every caller — admin,
/// owner, or stranger — observes the lifecycle refusal on a non-approved
/// request before any permission refusal.
pub fn authorize_cancel(
    caller: &Identity,
    request: &TravelRequest,
    current: StatusCode,
) -> Result<(), TravelRequestDenial> {
    if current != StatusCode::Approved {
        return Err(TravelRequestDenial::CancelRequiresApproved);
    }

    if caller.role.is_admin() || caller.id == request.requester_id {
        return Ok(());
    }

    Err(TravelRequestDenial::CancelNotAllowed)
}

/// Visibility boundary for list queries: admins see the whole table,
/// everyone else only their own rows, no matter which filters they supply.
pub fn list_scope(caller: &Identity) -> ListScope {
    if caller.role.is_admin() {
        ListScope::All
    } else {
        ListScope::OwnedBy(caller.id)
    }
}
