use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical seed accounts for local development and end-to-end tests.
const SEED_USERS: &[SeedUserContract] = &[
    SeedUserContract {
        user_id: 9001,
        name: "Marta Ruiz",
        email: "admin@tripdesk.test",
        role: "admin",
        password: "wanderlust-admin",
        description: "administrator account",
    },
    SeedUserContract {
        user_id: 9002,
        name: "Freya Larsen",
        email: "freya@tripdesk.test",
        role: "user",
        password: "wanderlust",
        description: "traveler with pending, approved and cancelled requests",
    },
    SeedUserContract {
        user_id: 9003,
        name: "Diego Costa",
        email: "diego@tripdesk.test",
        role: "user",
        password: "wanderlust",
        description: "traveler with pending and approved requests",
    },
];

const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        request_id: 9101,
        requester_id: 9002,
        destination: "Lisbon",
        status_code: "S",
        departure_date: "2026-09-07 08:30:00",
        return_date: "2026-09-11 19:45:00",
    },
    SeedRequestContract {
        request_id: 9102,
        requester_id: 9003,
        destination: "Berlin",
        status_code: "S",
        departure_date: "2026-09-14 06:15:00",
        return_date: "2026-09-16 21:00:00",
    },
    SeedRequestContract {
        request_id: 9103,
        requester_id: 9002,
        destination: "Paris",
        status_code: "A",
        departure_date: "2026-10-05 09:00:00",
        return_date: "2026-10-09 18:30:00",
    },
    SeedRequestContract {
        request_id: 9104,
        requester_id: 9003,
        destination: "Oslo",
        status_code: "A",
        departure_date: "2026-10-12 07:45:00",
        return_date: "2026-10-15 20:10:00",
    },
    SeedRequestContract {
        request_id: 9105,
        requester_id: 9002,
        destination: "Madrid",
        status_code: "C",
        departure_date: "2026-11-02 10:00:00",
        return_date: "2026-11-06 17:20:00",
    },
];

const SEED_USER_IDS: &[i64] = &[9001, 9002, 9003];

const SEED_REQUEST_IDS: &[i64] = &[9101, 9102, 9103, 9104, 9105];

/// Deterministic fixture dataset: three accounts and five travel requests
/// spanning every lifecycle state.
pub struct SeedDataset;

impl SeedDataset {
    /// SQL fixture content for the seed dataset.
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Load the seed dataset into the database. Safe to re-run; the script
    /// resets the seeded rows in place.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let users_seeded = SEED_USERS
            .iter()
            .map(|user| UserSeedInfo {
                email: user.email,
                role: user.role,
                password: user.password,
                description: user.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { users_seeded, requests_seeded: SEED_REQUESTS.len() })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for user in SEED_USERS {
            let user_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users
                 WHERE id = ?1 AND name = ?2 AND email = ?3 AND role = ?4
                   AND length(password_hash) = 64 AND length(password_salt) = 16)",
            )
            .bind(user.user_id)
            .bind(user.name)
            .bind(user.email)
            .bind(user.role)
            .fetch_one(pool)
            .await?;
            checks.push((user.email, user_ok == 1));
        }

        for request in SEED_REQUESTS {
            let request_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM travel_requests tr
                 JOIN travel_status ts ON ts.id = tr.status_id
                 WHERE tr.id = ?1 AND tr.requester_id = ?2 AND tr.destination = ?3
                   AND ts.code = ?4 AND tr.departure_date = ?5 AND tr.return_date = ?6)",
            )
            .bind(request.request_id)
            .bind(request.requester_id)
            .bind(request.destination)
            .bind(request.status_code)
            .bind(request.departure_date)
            .bind(request.return_date)
            .fetch_one(pool)
            .await?;
            checks.push((request.destination, request_ok == 1));
        }

        let quoted_requests = sql_array_from_ids(SEED_REQUEST_IDS);
        for (label, code, expected) in
            [("pending-count", "S", 2_i64), ("approved-count", "A", 2), ("cancelled-count", "C", 1)]
        {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM travel_requests tr
                 JOIN travel_status ts ON ts.id = tr.status_id
                 WHERE tr.id IN {quoted_requests} AND ts.code = ?1"
            ))
            .bind(code)
            .fetch_one(pool)
            .await?;
            checks.push((label, count == expected));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_users = sql_array_from_ids(SEED_USER_IDS);
        let quoted_requests = sql_array_from_ids(SEED_REQUEST_IDS);

        sqlx::query(&format!("DELETE FROM sessions WHERE user_id IN {quoted_users}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM travel_requests WHERE id IN {quoted_requests}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM users WHERE id IN {quoted_users}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedUserContract {
    user_id: i64,
    name: &'static str,
    email: &'static str,
    role: &'static str,
    /// Plaintext counterpart of the stored hash, for end-to-end logins.
    password: &'static str,
    description: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedRequestContract {
    request_id: i64,
    requester_id: i64,
    destination: &'static str,
    status_code: &'static str,
    departure_date: &'static str,
    return_date: &'static str,
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub users_seeded: Vec<UserSeedInfo>,
    pub requests_seeded: usize,
}

#[derive(Debug)]
pub struct UserSeedInfo {
    pub email: &'static str,
    pub role: &'static str,
    pub password: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!SeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = SeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = SeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.users_seeded.len(), 3);
        assert_eq!(first.requests_seeded, 5);

        let second = SeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification = SeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.users_seeded.len(), 3);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn verify_seed_specific_properties() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        SeedDataset::load(&pool).await.expect("load seed fixtures");

        let admin_role: String = sqlx::query_scalar("SELECT role FROM users WHERE id = 9001")
            .fetch_one(&pool)
            .await
            .expect("query admin role");
        assert_eq!(admin_role, "admin");

        let paris_code: String = sqlx::query_scalar(
            "SELECT ts.code FROM travel_requests tr
             JOIN travel_status ts ON ts.id = tr.status_id WHERE tr.id = 9103",
        )
        .fetch_one(&pool)
        .await
        .expect("query paris status");
        assert_eq!(paris_code, "A");

        let freya_requests: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM travel_requests WHERE requester_id = 9002")
                .fetch_one(&pool)
                .await
                .expect("query freya request count");
        assert_eq!(freya_requests, 3);
    }

    #[tokio::test]
    async fn clean_removes_every_seeded_row() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        SeedDataset::load(&pool).await.expect("load seed fixtures");
        SeedDataset::clean(&pool).await.expect("clean seed fixtures");

        let remaining_users: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE id IN (9001, 9002, 9003)")
                .fetch_one(&pool)
                .await
                .expect("query remaining users");
        assert_eq!(remaining_users, 0);

        let verification = SeedDataset::verify(&pool).await.expect("verify after clean");
        assert!(!verification.all_present);
    }
}
