use chrono::Utc;
use sqlx::Row;

use tripdesk_core::domain::user::{Identity, Role, UserId};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

/// Insert payload. The password arrives pre-hashed; this layer never sees
/// plaintext credentials.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: Role,
}

/// Identity plus the stored verifier material, loaded for login checks only.
#[derive(Clone, Debug)]
pub struct UserCredentials {
    pub identity: Identity,
    pub password_hash: String,
    pub password_salt: String,
}

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_role(raw: &str) -> Result<Role, RepositoryError> {
    Role::parse(raw).ok_or_else(|| RepositoryError::Decode(format!("unknown role `{raw}`")))
}

fn row_to_identity(row: &sqlx::sqlite::SqliteRow) -> Result<Identity, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_str: String =
        row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Identity { id: UserId(id), name, email, role: parse_role(&role_str)? })
}

fn row_to_credentials(row: &sqlx::sqlite::SqliteRow) -> Result<UserCredentials, RepositoryError> {
    let identity = row_to_identity(row)?;
    let password_hash: String =
        row.try_get("password_hash").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let password_salt: String =
        row.try_get("password_salt").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(UserCredentials { identity, password_hash, password_salt })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Identity>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, email, role FROM users WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_identity(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, role, password_hash, password_salt
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_credentials(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, new_user: NewUser) -> Result<Identity, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, password_salt, role,
                                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.password_salt)
        .bind(new_user.role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Identity {
            id: UserId(result.last_insert_rowid()),
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
        })
    }

    async fn list(&self) -> Result<Vec<Identity>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, email, role FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_identity).collect::<Result<Vec<_>, _>>()
    }
}
