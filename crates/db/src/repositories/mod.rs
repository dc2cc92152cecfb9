use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tripdesk_core::domain::status::StatusRegistry;
use tripdesk_core::domain::travel_request::{
    ListScope, RequestFilters, TravelRequest, TravelRequestDraft, TravelRequestId,
};
use tripdesk_core::domain::user::{Identity, UserId};

pub mod memory;
pub mod session;
pub mod status;
pub mod travel_request;
pub mod user;

pub use memory::{
    seeded_registry, InMemorySessionRepository, InMemoryStatusRepository,
    InMemoryTravelRequestRepository, InMemoryUserRepository,
};
pub use session::{Session, SqlSessionRepository};
pub use status::SqlStatusRepository;
pub use travel_request::SqlTravelRequestRepository;
pub use user::{NewUser, SqlUserRepository, UserCredentials};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait TravelRequestRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &TravelRequestId,
    ) -> Result<Option<TravelRequest>, RepositoryError>;

    async fn create(&self, draft: TravelRequestDraft) -> Result<TravelRequest, RepositoryError>;

    async fn update(&self, request: &TravelRequest) -> Result<(), RepositoryError>;

    async fn list(
        &self,
        scope: ListScope,
        filters: &RequestFilters,
    ) -> Result<Vec<TravelRequest>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Identity>, RepositoryError>;

    async fn find_by_email(&self, email: &str)
        -> Result<Option<UserCredentials>, RepositoryError>;

    async fn create(&self, new_user: NewUser) -> Result<Identity, RepositoryError>;

    async fn list(&self) -> Result<Vec<Identity>, RepositoryError>;
}

#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn load_registry(&self) -> Result<StatusRegistry, RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), RepositoryError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, RepositoryError>;

    async fn delete(&self, token: &str) -> Result<(), RepositoryError>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}
