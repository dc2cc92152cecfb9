use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::status::StatusCode;
use crate::domain::travel_request::TravelRequest;
use crate::domain::user::Identity;

/// Snapshot handed to dispatchers when a request changes status. The
/// recipient's email is the deliverable channel; a notice without one is a
/// dispatcher no-op, never a rule-layer concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeNotice {
    pub recipient_name: String,
    pub recipient_email: Option<String>,
    pub request: TravelRequest,
    pub new_status: StatusCode,
}

impl StatusChangeNotice {
    pub fn new(recipient: &Identity, request: &TravelRequest, new_status: StatusCode) -> Self {
        let email = recipient.email.trim();
        Self {
            recipient_name: recipient.name.clone(),
            recipient_email: if email.is_empty() { None } else { Some(email.to_string()) },
            request: request.clone(),
            new_status,
        }
    }

    pub fn deliverable(&self) -> bool {
        self.recipient_email.is_some()
    }
}

/// Fire-and-forget side-effect port. Implementations own queueing, retry,
/// and failure logging; nothing they do can fail the transition that
/// triggered the notice.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notice: StatusChangeNotice);
}

/// Swallows every notice. Used when no mail channel is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopNotificationDispatcher {
    async fn dispatch(&self, _notice: StatusChangeNotice) {}
}

/// Test double that records every notice it is handed.
#[derive(Clone, Default)]
pub struct RecordingNotificationDispatcher {
    notices: Arc<Mutex<Vec<StatusChangeNotice>>>,
}

impl RecordingNotificationDispatcher {
    pub fn notices(&self) -> Vec<StatusChangeNotice> {
        match self.notices.lock() {
            Ok(notices) => notices.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotificationDispatcher {
    async fn dispatch(&self, notice: StatusChangeNotice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{NotificationDispatcher, RecordingNotificationDispatcher, StatusChangeNotice};
    use crate::domain::status::{StatusCode, StatusId};
    use crate::domain::travel_request::{parse_wire_datetime, TravelRequest, TravelRequestId};
    use crate::domain::user::{Identity, Role, UserId};

    fn requester(email: &str) -> Identity {
        Identity {
            id: UserId(7),
            name: "Dana".into(),
            email: email.into(),
            role: Role::User,
        }
    }

    fn request() -> TravelRequest {
        TravelRequest {
            id: TravelRequestId(10),
            requester_id: UserId(7),
            requester_name: "Dana".into(),
            destination: "Paris".into(),
            departure_date: parse_wire_datetime("2025-09-01 10:00:00").expect("departure"),
            return_date: parse_wire_datetime("2025-09-05 18:00:00").expect("return"),
            status_id: StatusId(2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn blank_email_means_no_deliverable_channel() {
        let notice =
            StatusChangeNotice::new(&requester("  "), &request(), StatusCode::Approved);
        assert!(!notice.deliverable());
        assert_eq!(notice.recipient_email, None);
    }

    #[tokio::test]
    async fn recording_dispatcher_captures_notices_in_order() {
        let dispatcher = RecordingNotificationDispatcher::default();
        let approved =
            StatusChangeNotice::new(&requester("dana@example.com"), &request(), StatusCode::Approved);
        let cancelled =
            StatusChangeNotice::new(&requester("dana@example.com"), &request(), StatusCode::Cancelled);

        dispatcher.dispatch(approved.clone()).await;
        dispatcher.dispatch(cancelled).await;

        let notices = dispatcher.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0], approved);
        assert_eq!(notices[1].new_status, StatusCode::Cancelled);
        assert!(notices[0].deliverable());
    }
}
