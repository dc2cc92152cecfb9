use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row};

use tripdesk_core::domain::status::StatusId;
use tripdesk_core::domain::travel_request::{
    format_wire_datetime, parse_wire_datetime, ListScope, RequestFilters, TravelRequest,
    TravelRequestDraft, TravelRequestId,
};
use tripdesk_core::domain::user::UserId;

use super::{RepositoryError, TravelRequestRepository};
use crate::DbPool;

pub struct SqlTravelRequestRepository {
    pool: DbPool,
}

impl SqlTravelRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_travel_request(row: &sqlx::sqlite::SqliteRow) -> Result<TravelRequest, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_id: i64 =
        row.try_get("requester_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_name: String =
        row.try_get("requester_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let destination: String =
        row.try_get("destination").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let departure_date_str: String =
        row.try_get("departure_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let return_date_str: String =
        row.try_get("return_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_id: i64 =
        row.try_get("status_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let departure_date = parse_wire_datetime(&departure_date_str).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid departure_date `{departure_date_str}`"))
    })?;
    let return_date = parse_wire_datetime(&return_date_str).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid return_date `{return_date_str}`"))
    })?;

    Ok(TravelRequest {
        id: TravelRequestId(id),
        requester_id: UserId(requester_id),
        requester_name,
        destination,
        departure_date,
        return_date,
        status_id: StatusId(status_id),
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

#[async_trait::async_trait]
impl TravelRequestRepository for SqlTravelRequestRepository {
    async fn find_by_id(
        &self,
        id: &TravelRequestId,
    ) -> Result<Option<TravelRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, requester_id, requester_name, destination, departure_date, return_date,
                    status_id, created_at, updated_at
             FROM travel_requests WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_travel_request(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, draft: TravelRequestDraft) -> Result<TravelRequest, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO travel_requests (requester_id, requester_name, destination,
                                          departure_date, return_date, status_id,
                                          created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(draft.requester_id.0)
        .bind(&draft.requester_name)
        .bind(&draft.destination)
        .bind(format_wire_datetime(&draft.departure_date))
        .bind(format_wire_datetime(&draft.return_date))
        .bind(draft.status_id.0)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(TravelRequest {
            id: TravelRequestId(result.last_insert_rowid()),
            requester_id: draft.requester_id,
            requester_name: draft.requester_name,
            destination: draft.destination,
            departure_date: draft.departure_date,
            return_date: draft.return_date,
            status_id: draft.status_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, request: &TravelRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE travel_requests
             SET destination = ?, departure_date = ?, return_date = ?, status_id = ?,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(&request.destination)
        .bind(format_wire_datetime(&request.departure_date))
        .bind(format_wire_datetime(&request.return_date))
        .bind(request.status_id.0)
        .bind(request.updated_at.to_rfc3339())
        .bind(request.id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // The wire datetime format sorts lexicographically, so the date bounds
    // compare correctly as TEXT.
    async fn list(
        &self,
        scope: ListScope,
        filters: &RequestFilters,
    ) -> Result<Vec<TravelRequest>, RepositoryError> {
        let mut builder = QueryBuilder::new(
            "SELECT id, requester_id, requester_name, destination, departure_date, return_date,
                    status_id, created_at, updated_at
             FROM travel_requests WHERE 1 = 1",
        );

        if let ListScope::OwnedBy(owner) = scope {
            builder.push(" AND requester_id = ").push_bind(owner.0);
        }
        if let Some(code) = filters.status_code {
            builder
                .push(" AND status_id = (SELECT id FROM travel_status WHERE code = ")
                .push_bind(code.code())
                .push(")");
        }
        if let Some(destination) = &filters.destination {
            builder.push(" AND destination = ").push_bind(destination.clone());
        }
        if let Some(floor) = filters.departure_floor() {
            builder.push(" AND departure_date >= ").push_bind(format_wire_datetime(&floor));
        }
        if let Some(ceiling) = filters.return_ceiling() {
            builder.push(" AND return_date <= ").push_bind(format_wire_datetime(&ceiling));
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_travel_request).collect::<Result<Vec<_>, _>>()
    }
}
