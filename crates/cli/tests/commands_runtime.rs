use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tripdesk_cli::commands::{config, doctor, migrate, seed};
use tripdesk_db::{connect_with_settings, migrations};

#[test]
fn migrate_applies_both_schema_migrations() {
    with_env(
        &[
            ("TRIPDESK_DATABASE_URL", "sqlite::memory:"),
            ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
            assert_eq!(payload["message"], "applied 2 pending migrations");
        },
    );
}

#[test]
fn migrate_reports_invalid_config_with_exit_code_two() {
    with_env(&[("TRIPDESK_DATABASE_URL", "postgres://tripdesk")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_and_verifies_the_demo_dataset() {
    with_env(
        &[
            ("TRIPDESK_DATABASE_URL", "sqlite::memory:"),
            ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected successful seed run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            let admin_line =
                "  - admin: admin@tripdesk.test / wanderlust-admin (administrator account)";
            let freya_line =
                "  - user: freya@tripdesk.test / wanderlust (traveler with pending, approved and cancelled requests)";
            let diego_line =
                "  - user: diego@tripdesk.test / wanderlust (traveler with pending and approved requests)";
            assert!(message.contains("seed dataset loaded: 3 accounts and 5 travel requests"));
            assert!(message.contains(admin_line));
            assert!(message.contains(freya_line));
            assert!(message.contains(diego_line));
        },
    );
}

#[test]
fn seed_summary_is_deterministic_across_runs() {
    with_env(
        &[
            ("TRIPDESK_DATABASE_URL", "sqlite::memory:"),
            ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let first = seed::run();
            assert_eq!(first.exit_code, 0, "expected first seed invocation success");
            let first_payload = parse_payload(&first.output);
            assert_eq!(first_payload["status"], "ok");

            let second = seed::run();
            assert_eq!(second.exit_code, 0, "expected second seed invocation success");
            let second_payload = parse_payload(&second.output);
            assert_eq!(second_payload["status"], "ok");

            assert_eq!(first_payload["message"], second_payload["message"]);
        },
    );
}

#[test]
fn doctor_passes_against_a_migrated_database() {
    let db_url = "sqlite:file:cli_doctor_pass?mode=memory&cache=shared";
    with_env(
        &[("TRIPDESK_DATABASE_URL", db_url), ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test runtime");
            // The named in-memory database lives as long as this pool does.
            let keeper = runtime.block_on(async {
                let pool = connect_with_settings(db_url, 1, 5).await.expect("hold database");
                migrations::run_pending(&pool).await.expect("prepare schema");
                pool
            });

            let report: Value =
                serde_json::from_str(&doctor::run(true)).expect("doctor emits valid JSON");
            assert_eq!(report["overall_status"], "pass");

            let statuses = check_statuses(&report);
            assert_eq!(statuses["config_validation"], "pass");
            assert_eq!(statuses["database_connectivity"], "pass");
            assert_eq!(statuses["migration_freshness"], "pass");
            assert_eq!(statuses["status_registry"], "pass");
            assert_eq!(statuses["mail_configuration"], "pass");

            runtime.block_on(keeper.close());
        },
    );
}

#[test]
fn doctor_flags_a_database_behind_on_migrations() {
    let db_url = "sqlite:file:cli_doctor_stale?mode=memory&cache=shared";
    with_env(
        &[("TRIPDESK_DATABASE_URL", db_url), ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test runtime");
            let keeper = runtime.block_on(async {
                connect_with_settings(db_url, 1, 5).await.expect("hold database")
            });

            let report: Value =
                serde_json::from_str(&doctor::run(true)).expect("doctor emits valid JSON");
            assert_eq!(report["overall_status"], "fail");

            let statuses = check_statuses(&report);
            assert_eq!(statuses["database_connectivity"], "pass");
            assert_eq!(statuses["migration_freshness"], "fail");
            assert_eq!(statuses["status_registry"], "fail");

            let freshness = check_details(&report, "migration_freshness");
            assert!(freshness.contains("run `tripdesk migrate`"));

            runtime.block_on(keeper.close());
        },
    );
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("TRIPDESK_DATABASE_URL", "postgres://tripdesk")], || {
        let report: Value =
            serde_json::from_str(&doctor::run(true)).expect("doctor emits valid JSON");
        assert_eq!(report["overall_status"], "fail");

        let statuses = check_statuses(&report);
        assert_eq!(statuses["config_validation"], "fail");
        assert_eq!(statuses["database_connectivity"], "skipped");
        assert_eq!(statuses["migration_freshness"], "skipped");
        assert_eq!(statuses["status_registry"], "skipped");
        assert_eq!(statuses["mail_configuration"], "skipped");

        let human = doctor::run(false);
        assert!(human.starts_with("doctor: one or more readiness checks failed"));
        assert!(human.contains("- [fail] config_validation:"));
        assert!(human.contains("- [skip] database_connectivity:"));
    });
}

#[test]
fn config_attributes_sources_for_overridden_and_default_keys() {
    with_env(
        &[("TRIPDESK_DATABASE_URL", "sqlite::memory:"), ("TRIPDESK_LOG_LEVEL", "debug")],
        || {
            let output = config::run();

            assert!(output
                .starts_with("effective config (source precedence: env > file > default):"));
            assert!(output
                .contains("- database.url = sqlite::memory: (source: env (TRIPDESK_DATABASE_URL))"));
            assert!(output.contains("- logging.level = debug (source: env (TRIPDESK_LOG_LEVEL))"));
            assert!(output.contains("- auth.cookie_name = tripdesk_token (source: default)"));
            assert!(output.contains("- mail.smtp_password = <unset> (source: default)"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn check_statuses(report: &Value) -> std::collections::HashMap<String, String> {
    report["checks"]
        .as_array()
        .expect("doctor report carries a checks array")
        .iter()
        .map(|check| {
            (
                check["name"].as_str().unwrap_or_default().to_string(),
                check["status"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

fn check_details(report: &Value, name: &str) -> String {
    report["checks"]
        .as_array()
        .expect("doctor report carries a checks array")
        .iter()
        .find(|check| check["name"] == name)
        .map(|check| check["details"].as_str().unwrap_or_default().to_string())
        .unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TRIPDESK_CONFIG",
        "TRIPDESK_SERVER_BIND_ADDRESS",
        "TRIPDESK_SERVER_PORT",
        "TRIPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "TRIPDESK_DATABASE_URL",
        "TRIPDESK_DATABASE_MAX_CONNECTIONS",
        "TRIPDESK_DATABASE_TIMEOUT_SECS",
        "TRIPDESK_AUTH_SESSION_TTL_SECS",
        "TRIPDESK_AUTH_COOKIE_NAME",
        "TRIPDESK_AUTH_COOKIE_SECURE",
        "TRIPDESK_MAIL_TRANSPORT",
        "TRIPDESK_MAIL_FROM_ADDRESS",
        "TRIPDESK_MAIL_SMTP_HOST",
        "TRIPDESK_MAIL_SMTP_PORT",
        "TRIPDESK_MAIL_SMTP_USERNAME",
        "TRIPDESK_MAIL_SMTP_PASSWORD",
        "TRIPDESK_MAIL_MAX_RETRIES",
        "TRIPDESK_LOGGING_LEVEL",
        "TRIPDESK_LOGGING_FORMAT",
        "TRIPDESK_LOG_LEVEL",
        "TRIPDESK_LOG_FORMAT",
        "TRIPDESK_DEBUG",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
