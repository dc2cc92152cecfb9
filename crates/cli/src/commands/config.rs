use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tripdesk_core::config::{AppConfig, LoadOptions, LogFormat, MailTransportKind};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", &["TRIPDESK_DATABASE_URL"]),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", &["TRIPDESK_DATABASE_MAX_CONNECTIONS"]),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", &["TRIPDESK_DATABASE_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["TRIPDESK_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", &["TRIPDESK_SERVER_PORT"]),
    ));
    lines.push(render_line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        source("server.graceful_shutdown_secs", &["TRIPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ));

    lines.push(render_line(
        "auth.session_ttl_secs",
        &config.auth.session_ttl_secs.to_string(),
        source("auth.session_ttl_secs", &["TRIPDESK_AUTH_SESSION_TTL_SECS"]),
    ));
    lines.push(render_line(
        "auth.cookie_name",
        &config.auth.cookie_name,
        source("auth.cookie_name", &["TRIPDESK_AUTH_COOKIE_NAME"]),
    ));
    lines.push(render_line(
        "auth.cookie_secure",
        &config.auth.cookie_secure.to_string(),
        source("auth.cookie_secure", &["TRIPDESK_AUTH_COOKIE_SECURE"]),
    ));

    lines.push(render_line(
        "mail.transport",
        transport_label(config.mail.transport),
        source("mail.transport", &["TRIPDESK_MAIL_TRANSPORT"]),
    ));
    lines.push(render_line(
        "mail.from_address",
        &config.mail.from_address,
        source("mail.from_address", &["TRIPDESK_MAIL_FROM_ADDRESS"]),
    ));
    lines.push(render_line(
        "mail.smtp_host",
        &config.mail.smtp_host,
        source("mail.smtp_host", &["TRIPDESK_MAIL_SMTP_HOST"]),
    ));
    lines.push(render_line(
        "mail.smtp_port",
        &config.mail.smtp_port.to_string(),
        source("mail.smtp_port", &["TRIPDESK_MAIL_SMTP_PORT"]),
    ));
    lines.push(render_line(
        "mail.smtp_username",
        config.mail.smtp_username.as_deref().unwrap_or("<unset>"),
        source("mail.smtp_username", &["TRIPDESK_MAIL_SMTP_USERNAME"]),
    ));

    // The password value never leaves the secrecy wrapper here.
    let smtp_password = if config.mail.smtp_password.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "mail.smtp_password",
        smtp_password,
        source("mail.smtp_password", &["TRIPDESK_MAIL_SMTP_PASSWORD"]),
    ));
    lines.push(render_line(
        "mail.max_retries",
        &config.mail.max_retries.to_string(),
        source("mail.max_retries", &["TRIPDESK_MAIL_MAX_RETRIES"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["TRIPDESK_LOGGING_LEVEL", "TRIPDESK_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        format_label(config.logging.format),
        source("logging.format", &["TRIPDESK_LOGGING_FORMAT", "TRIPDESK_LOG_FORMAT"]),
    ));

    lines.push(render_line(
        "debug",
        &config.debug.to_string(),
        source("debug", &["TRIPDESK_DEBUG"]),
    ));

    lines.join("\n")
}

fn transport_label(kind: MailTransportKind) -> &'static str {
    match kind {
        MailTransportKind::Smtp => "smtp",
        MailTransportKind::Console => "console",
        MailTransportKind::Noop => "noop",
    }
}

fn format_label(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}

/// Mirrors the lookup order `AppConfig::load` uses so the attribution below
/// points at the file that was actually read.
fn detect_config_path() -> Option<PathBuf> {
    if let Some(env_path) = env::var_os("TRIPDESK_CONFIG").map(PathBuf::from) {
        if env_path.exists() {
            return Some(env_path);
        }
    }

    [PathBuf::from("tripdesk.toml"), PathBuf::from("config/tripdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
