use sha2::{Digest, Sha256};

use tripdesk_core::domain::travel_request::parse_wire_datetime;

type SeedTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

const FIXTURE_SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

/// (email, salt, plaintext password) triples documented in the fixture header.
const SEED_CREDENTIALS: &[(&str, &str, &str)] = &[
    ("admin@tripdesk.test", "5f1c3e7a9b2d4086", "wanderlust-admin"),
    ("freya@tripdesk.test", "83a6d1f04c9e2b75", "wanderlust"),
    ("diego@tripdesk.test", "2b9e4d7c1a8f3650", "wanderlust"),
];

const SEED_IDS: &[&str] = &["9001", "9002", "9003", "9101", "9102", "9103", "9104", "9105"];

const SEED_TRAVEL_DATES: &[&str] = &[
    "2026-09-07 08:30:00",
    "2026-09-11 19:45:00",
    "2026-09-14 06:15:00",
    "2026-09-16 21:00:00",
    "2026-10-05 09:00:00",
    "2026-10-09 18:30:00",
    "2026-10-12 07:45:00",
    "2026-10-15 20:10:00",
    "2026-11-02 10:00:00",
    "2026-11-06 17:20:00",
];

fn salted_hash(salt: &str, password: &str) -> String {
    let digest = Sha256::digest(format!("{salt}{password}").as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[test]
fn seed_accounts_match_their_documented_credentials() -> SeedTestResult {
    for (email, salt, password) in SEED_CREDENTIALS {
        require!(FIXTURE_SQL.contains(email), "seed SQL should include account {}", email);
        require!(FIXTURE_SQL.contains(salt), "seed SQL should include salt for {}", email);

        let expected_hash = salted_hash(salt, password);
        require!(
            FIXTURE_SQL.contains(&expected_hash),
            "stored hash for {} should be hex(sha256(salt || password)), expected {}",
            email,
            expected_hash
        );
    }
    Ok(())
}

#[test]
fn seed_sql_resets_every_pinned_row() -> SeedTestResult {
    for id in SEED_IDS {
        require!(FIXTURE_SQL.contains(id), "seed SQL should pin id {}", id);
    }

    // The script must clear dependents before parents or re-running it
    // trips the foreign keys.
    let sessions_delete = FIXTURE_SQL
        .find("DELETE FROM sessions")
        .ok_or_else(|| "seed SQL should reset seeded sessions".to_string())?;
    let requests_delete = FIXTURE_SQL
        .find("DELETE FROM travel_requests")
        .ok_or_else(|| "seed SQL should reset seeded travel requests".to_string())?;
    let users_delete = FIXTURE_SQL
        .find("DELETE FROM users")
        .ok_or_else(|| "seed SQL should reset seeded users".to_string())?;

    require!(sessions_delete < users_delete, "sessions must be cleared before users");
    require!(requests_delete < users_delete, "travel requests must be cleared before users");
    Ok(())
}

#[test]
fn seed_travel_dates_use_the_wire_format() -> SeedTestResult {
    for raw in SEED_TRAVEL_DATES {
        require!(
            parse_wire_datetime(raw).is_some(),
            "seed travel date {} should parse with the wire format",
            raw
        );
        require!(FIXTURE_SQL.contains(raw), "seed SQL should include travel date {}", raw);
    }
    Ok(())
}

#[test]
fn seed_sql_never_touches_the_status_reference_table() -> SeedTestResult {
    // The initial migration owns travel_status; reseeding data must not
    // rewrite the lifecycle rows.
    require!(!FIXTURE_SQL.contains("INSERT INTO travel_status"));
    require!(!FIXTURE_SQL.contains("DELETE FROM travel_status"));
    Ok(())
}
