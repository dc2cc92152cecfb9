use std::collections::BTreeSet;

use sqlx::migrate::{Migrate, MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Embedded migration versions that have not been applied to the database yet.
pub async fn pending_versions(pool: &DbPool) -> Result<Vec<i64>, MigrateError> {
    let mut conn = pool.acquire().await.map_err(MigrateError::Execute)?;
    conn.ensure_migrations_table().await?;
    let applied: BTreeSet<i64> = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|migration| migration.version)
        .collect();

    // Up and down entries share a version; the set folds them together.
    let embedded: BTreeSet<i64> = MIGRATOR.iter().map(|migration| migration.version).collect();
    Ok(embedded.into_iter().filter(|version| !applied.contains(version)).collect())
}
