use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use reqflow_core::config::AppConfig;
use toml::Value;

use crate::commands::CommandResult;

pub fn run(config: &AppConfig, explicit_path: Option<&Path>) -> CommandResult {
    CommandResult { exit_code: 0, output: render(config, explicit_path) }
}

pub fn render(config: &AppConfig, explicit_path: Option<&Path>) -> String {
    let config_file_path = detect_config_path(explicit_path);
    let doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, doc.as_ref(), config_file_path.as_deref())
    };

    let reviewer_only = if config.lifecycle.reviewer_only_kinds.is_empty() {
        "<none>".to_string()
    } else {
        config
            .lifecycle
            .reviewer_only_kinds
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(",")
    };
    let api_token = if config.api.token.is_some() { "<redacted>" } else { "<unset>" };

    let lines = [
        "effective config (source precedence: flag > env > file > default):".to_string(),
        render_line("api.base_url", &config.api.base_url, source("api.base_url", &["REQFLOW_API_BASE_URL"])),
        render_line(
            "api.timeout_secs",
            &config.api.timeout_secs.to_string(),
            source("api.timeout_secs", &["REQFLOW_API_TIMEOUT_SECS"]),
        ),
        render_line(
            "api.max_retries",
            &config.api.max_retries.to_string(),
            source("api.max_retries", &["REQFLOW_API_MAX_RETRIES"]),
        ),
        render_line(
            "api.retry_base_delay_ms",
            &config.api.retry_base_delay_ms.to_string(),
            source("api.retry_base_delay_ms", &["REQFLOW_API_RETRY_BASE_DELAY_MS"]),
        ),
        render_line("api.token", api_token, source("api.token", &["REQFLOW_API_TOKEN"])),
        render_line(
            "session.storage_dir",
            &config.session.storage_dir.display().to_string(),
            source("session.storage_dir", &["REQFLOW_SESSION_STORAGE_DIR"]),
        ),
        render_line(
            "session.token_ttl_days",
            &config.session.token_ttl_days.to_string(),
            source("session.token_ttl_days", &["REQFLOW_SESSION_TOKEN_TTL_DAYS"]),
        ),
        render_line(
            "lifecycle.reviewer_only_kinds",
            &reviewer_only,
            source("lifecycle.reviewer_only_kinds", &["REQFLOW_LIFECYCLE_REVIEWER_ONLY_KINDS"]),
        ),
        render_line(
            "employment.global_lock",
            &config.employment.global_lock.to_string(),
            source("employment.global_lock", &["REQFLOW_EMPLOYMENT_GLOBAL_LOCK"]),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["REQFLOW_LOGGING_LEVEL", "REQFLOW_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            source("logging.format", &["REQFLOW_LOGGING_FORMAT", "REQFLOW_LOG_FORMAT"]),
        ),
    ];

    lines.join("\n")
}

fn detect_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("reqflow.toml"), PathBuf::from("config/reqflow.toml")]
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
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
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
