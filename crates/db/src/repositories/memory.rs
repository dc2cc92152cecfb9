use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tripdesk_core::domain::status::{StatusCode, StatusId, StatusRegistry, TravelStatus};
use tripdesk_core::domain::travel_request::{
    ListScope, RequestFilters, TravelRequest, TravelRequestDraft, TravelRequestId,
};
use tripdesk_core::domain::user::{Identity, UserId};

use super::{
    NewUser, RepositoryError, Session, SessionRepository, StatusRepository,
    TravelRequestRepository, UserCredentials, UserRepository,
};

/// Registry mirroring the rows the initial migration seeds.
pub fn seeded_registry() -> StatusRegistry {
    StatusRegistry::new(vec![
        TravelStatus { id: StatusId(1), code: StatusCode::Requested, name: "Requested".into() },
        TravelStatus { id: StatusId(2), code: StatusCode::Approved, name: "Approved".into() },
        TravelStatus { id: StatusId(3), code: StatusCode::Cancelled, name: "Cancelled".into() },
    ])
}

pub struct InMemoryTravelRequestRepository {
    requests: RwLock<HashMap<i64, TravelRequest>>,
    next_id: AtomicI64,
    registry: StatusRegistry,
}

impl Default for InMemoryTravelRequestRepository {
    fn default() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            registry: seeded_registry(),
        }
    }
}

#[async_trait::async_trait]
impl TravelRequestRepository for InMemoryTravelRequestRepository {
    async fn find_by_id(
        &self,
        id: &TravelRequestId,
    ) -> Result<Option<TravelRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn create(&self, draft: TravelRequestDraft) -> Result<TravelRequest, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let request = TravelRequest {
            id: TravelRequestId(id),
            requester_id: draft.requester_id,
            requester_name: draft.requester_name,
            destination: draft.destination,
            departure_date: draft.departure_date,
            return_date: draft.return_date,
            status_id: draft.status_id,
            created_at: now,
            updated_at: now,
        };

        let mut requests = self.requests.write().await;
        requests.insert(id, request.clone());
        Ok(request)
    }

    async fn update(&self, request: &TravelRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0, request.clone());
        Ok(())
    }

    async fn list(
        &self,
        scope: ListScope,
        filters: &RequestFilters,
    ) -> Result<Vec<TravelRequest>, RepositoryError> {
        let requests = self.requests.read().await;

        let mut rows = Vec::new();
        for request in requests.values() {
            if let ListScope::OwnedBy(owner) = scope {
                if request.requester_id != owner {
                    continue;
                }
            }
            let code = self
                .registry
                .code_of(request.status_id)
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            if filters.matches(request, code) {
                rows.push(request.clone());
            }
        }

        rows.sort_by_key(|request| request.id.0);
        Ok(rows)
    }
}

/// Credential rows keyed by id. Uniqueness of emails is not enforced here;
/// the schema owns that constraint.
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<i64, UserCredentials>>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self { users: RwLock::new(HashMap::new()), next_id: AtomicI64::new(1) }
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Identity>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).map(|stored| stored.identity.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|stored| stored.identity.email == email).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<Identity, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let identity = Identity {
            id: UserId(id),
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
        };

        let mut users = self.users.write().await;
        users.insert(
            id,
            UserCredentials {
                identity: identity.clone(),
                password_hash: new_user.password_hash,
                password_salt: new_user.password_salt,
            },
        );
        Ok(identity)
    }

    async fn list(&self) -> Result<Vec<Identity>, RepositoryError> {
        let users = self.users.read().await;
        let mut identities: Vec<_> =
            users.values().map(|stored| stored.identity.clone()).collect();
        identities.sort_by_key(|identity| identity.id.0);
        Ok(identities)
    }
}

pub struct InMemoryStatusRepository {
    registry: StatusRegistry,
}

impl Default for InMemoryStatusRepository {
    fn default() -> Self {
        Self { registry: seeded_registry() }
    }
}

#[async_trait::async_trait]
impl StatusRepository for InMemoryStatusRepository {
    async fn load_registry(&self) -> Result<StatusRegistry, RepositoryError> {
        Ok(self.registry.clone())
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, Session>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(token);
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}
