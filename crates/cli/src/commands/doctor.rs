use secrecy::ExposeSecret;
use serde::Serialize;
use tripdesk_core::config::{AppConfig, LoadOptions, MailTransportKind};
use tripdesk_db::repositories::{SqlStatusRepository, StatusRepository};
use tripdesk_db::{connect_with_settings, migrations, DbPool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.extend(database_checks(&config));
            checks.push(check_mail_configuration(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in [
                "database_connectivity",
                "migration_freshness",
                "status_registry",
                "mail_configuration",
            ] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Connectivity, migration freshness, and status registry share one pool; the
/// later checks are meaningless when the earlier ones cannot reach the
/// database, so they degrade to skips instead of piling on failures.
fn database_checks(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                unreachable_database_check("migration_freshness"),
                unreachable_database_check("status_registry"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    unreachable_database_check("migration_freshness"),
                    unreachable_database_check("status_registry"),
                ];
            }
        };

        let mut checks = vec![DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        }];
        checks.push(check_migration_freshness(&pool).await);
        checks.push(check_status_registry(&pool).await);
        pool.close().await;
        checks
    })
}

fn unreachable_database_check(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because the database was unreachable".to_string(),
    }
}

async fn check_migration_freshness(pool: &DbPool) -> DoctorCheck {
    match migrations::pending_versions(pool).await {
        Ok(pending) if pending.is_empty() => DoctorCheck {
            name: "migration_freshness",
            status: CheckStatus::Pass,
            details: "all embedded migrations are applied".to_string(),
        },
        Ok(pending) => {
            let versions = pending.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
            DoctorCheck {
                name: "migration_freshness",
                status: CheckStatus::Fail,
                details: format!("pending migration versions {versions}; run `tripdesk migrate`"),
            }
        }
        Err(error) => DoctorCheck {
            name: "migration_freshness",
            status: CheckStatus::Fail,
            details: format!("failed to inspect applied migrations: {error}"),
        },
    }
}

async fn check_status_registry(pool: &DbPool) -> DoctorCheck {
    match load_complete_registry(pool).await {
        Ok(()) => DoctorCheck {
            name: "status_registry",
            status: CheckStatus::Pass,
            details: "every lifecycle status code resolves".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "status_registry",
            status: CheckStatus::Fail,
            details: format!("status registry is not serviceable: {error}"),
        },
    }
}

async fn load_complete_registry(pool: &DbPool) -> anyhow::Result<()> {
    let registry = SqlStatusRepository::new(pool.clone()).load_registry().await?;
    registry.verify_complete()?;
    Ok(())
}

fn check_mail_configuration(config: &AppConfig) -> DoctorCheck {
    let name = "mail_configuration";

    match config.mail.transport {
        MailTransportKind::Console => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: "`console` transport writes mail to the log; SMTP settings unused".to_string(),
        },
        MailTransportKind::Noop => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: "`noop` transport drops mail; SMTP settings unused".to_string(),
        },
        MailTransportKind::Smtp => {
            let blank_username = config
                .mail
                .smtp_username
                .as_deref()
                .is_some_and(|username| username.trim().is_empty());
            let blank_password = config
                .mail
                .smtp_password
                .as_ref()
                .is_some_and(|password| password.expose_secret().trim().is_empty());

            if blank_username || blank_password {
                DoctorCheck {
                    name,
                    status: CheckStatus::Fail,
                    details: "smtp credentials are set but blank".to_string(),
                }
            } else {
                let auth = if config.mail.smtp_username.is_some() {
                    "with authentication"
                } else {
                    "without authentication"
                };
                DoctorCheck {
                    name,
                    status: CheckStatus::Pass,
                    details: format!(
                        "smtp relay {}:{} {auth}",
                        config.mail.smtp_host, config.mail.smtp_port
                    ),
                }
            }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
