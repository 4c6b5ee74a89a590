use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::RequestKind;
use crate::lifecycle::LifecyclePolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub lifecycle: LifecycleConfig,
    pub employment: EmploymentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Static bearer token; when set it wins over the session store.
    pub token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub storage_dir: PathBuf,
    pub token_ttl_days: i64,
}

#[derive(Clone, Debug, Default)]
pub struct LifecycleConfig {
    pub reviewer_only_kinds: Vec<RequestKind>,
}

#[derive(Clone, Debug, Default)]
pub struct EmploymentConfig {
    pub global_lock: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub log_level: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub api_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:4000/api/v1".to_string(),
                timeout_secs: 30,
                max_retries: 3,
                retry_base_delay_ms: 1_000,
                token: None,
            },
            session: SessionConfig { storage_dir: PathBuf::from(".reqflow"), token_ttl_days: 7 },
            lifecycle: LifecycleConfig::default(),
            employment: EmploymentConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LifecycleConfig {
    pub fn policy(&self) -> LifecyclePolicy {
        LifecyclePolicy::reviewer_only(self.reviewer_only_kinds.iter().copied())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("reqflow.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = api.max_retries {
                self.api.max_retries = max_retries;
            }
            if let Some(retry_base_delay_ms) = api.retry_base_delay_ms {
                self.api.retry_base_delay_ms = retry_base_delay_ms;
            }
            if let Some(token) = api.token {
                self.api.token = Some(SecretString::from(token));
            }
        }

        if let Some(session) = patch.session {
            if let Some(storage_dir) = session.storage_dir {
                self.session.storage_dir = storage_dir;
            }
            if let Some(token_ttl_days) = session.token_ttl_days {
                self.session.token_ttl_days = token_ttl_days;
            }
        }

        if let Some(lifecycle) = patch.lifecycle {
            if let Some(kinds) = lifecycle.reviewer_only_kinds {
                self.lifecycle.reviewer_only_kinds = parse_kinds("lifecycle.reviewer_only_kinds", &kinds)?;
            }
        }

        if let Some(employment) = patch.employment {
            if let Some(global_lock) = employment.global_lock {
                self.employment.global_lock = global_lock;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("REQFLOW_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("REQFLOW_API_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_u64("REQFLOW_API_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("REQFLOW_API_MAX_RETRIES") {
            self.api.max_retries = parse_u32("REQFLOW_API_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("REQFLOW_API_RETRY_BASE_DELAY_MS") {
            self.api.retry_base_delay_ms = parse_u64("REQFLOW_API_RETRY_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("REQFLOW_API_TOKEN") {
            self.api.token = Some(SecretString::from(value));
        }

        if let Some(value) = read_env("REQFLOW_SESSION_STORAGE_DIR") {
            self.session.storage_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("REQFLOW_SESSION_TOKEN_TTL_DAYS") {
            self.session.token_ttl_days = value.parse::<i64>().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "REQFLOW_SESSION_TOKEN_TTL_DAYS".to_string(),
                    value: value.clone(),
                }
            })?;
        }

        if let Some(value) = read_env("REQFLOW_LIFECYCLE_REVIEWER_ONLY_KINDS") {
            let kinds: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|kind| !kind.is_empty())
                .map(str::to_string)
                .collect();
            self.lifecycle.reviewer_only_kinds =
                parse_kinds("REQFLOW_LIFECYCLE_REVIEWER_ONLY_KINDS", &kinds)?;
        }

        if let Some(value) = read_env("REQFLOW_EMPLOYMENT_GLOBAL_LOCK") {
            self.employment.global_lock = parse_bool("REQFLOW_EMPLOYMENT_GLOBAL_LOCK", &value)?;
        }

        let log_level = read_env("REQFLOW_LOGGING_LEVEL").or_else(|| read_env("REQFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("REQFLOW_LOGGING_FORMAT").or_else(|| read_env("REQFLOW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.api.base_url = base_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(storage_dir) = overrides.storage_dir {
            self.session.storage_dir = storage_dir;
        }
        if let Some(api_token) = overrides.api_token {
            self.api.token = Some(SecretString::from(api_token));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_session(&self.session)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("reqflow.toml"), PathBuf::from("config/reqflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }

    if api.timeout_secs == 0 || api.timeout_secs > 300 {
        return Err(ConfigError::Validation("api.timeout_secs must be in range 1..=300".to_string()));
    }

    if api.max_retries > 10 {
        return Err(ConfigError::Validation("api.max_retries must be at most 10".to_string()));
    }

    if api.retry_base_delay_ms == 0 {
        return Err(ConfigError::Validation(
            "api.retry_base_delay_ms must be greater than zero".to_string(),
        ));
    }

    if api.token.as_ref().is_some_and(|token| token.expose_secret().trim().is_empty()) {
        return Err(ConfigError::Validation("api.token must not be blank when set".to_string()));
    }

    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.storage_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("session.storage_dir must not be empty".to_string()));
    }

    if session.token_ttl_days <= 0 {
        return Err(ConfigError::Validation(
            "session.token_ttl_days must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn parse_kinds(key: &str, values: &[String]) -> Result<Vec<RequestKind>, ConfigError> {
    values
        .iter()
        .map(|value| {
            RequestKind::parse(value.trim()).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "{key} contains unknown request kind `{value}` \
                     (expected purchase|payment|advance|travel|expense|concept)"
                ))
            })
        })
        .collect()
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    session: Option<SessionPatch>,
    lifecycle: Option<LifecyclePatch>,
    employment: Option<EmploymentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    storage_dir: Option<PathBuf>,
    token_ttl_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LifecyclePatch {
    reviewer_only_kinds: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct EmploymentPatch {
    global_lock: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
