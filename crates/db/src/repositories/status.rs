use sqlx::Row;

use tripdesk_core::domain::status::{StatusCode, StatusId, StatusRegistry, TravelStatus};

use super::{RepositoryError, StatusRepository};
use crate::DbPool;

pub struct SqlStatusRepository {
    pool: DbPool,
}

impl SqlStatusRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_status(row: &sqlx::sqlite::SqliteRow) -> Result<TravelStatus, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let code_str: String =
        row.try_get("code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let code = StatusCode::parse(&code_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status code `{code_str}`")))?;

    Ok(TravelStatus { id: StatusId(id), code, name })
}

#[async_trait::async_trait]
impl StatusRepository for SqlStatusRepository {
    async fn load_registry(&self) -> Result<StatusRegistry, RepositoryError> {
        let rows = sqlx::query("SELECT id, code, name FROM travel_status ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let statuses = rows.iter().map(row_to_status).collect::<Result<Vec<_>, _>>()?;
        Ok(StatusRegistry::new(statuses))
    }
}
