pub mod config;
pub mod session;
pub mod status;
pub mod submit;
pub mod totals;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use reqflow_client::api::{StaticToken, TokenSource};
use reqflow_client::{
    ApiError, HttpTransport, MutationOutcome, QueryCache, SessionStore, Transport,
};
use reqflow_core::config::AppConfig;
use reqflow_core::domain::item_group::LineItem;
use reqflow_core::domain::request::{Request, RequestKind};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_outcome(command: &str, outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::Completed { message, .. } => Self::success(
                command,
                message.unwrap_or_else(|| "request accepted".to_string()),
            ),
            MutationOutcome::Rejected { message } => Self::failure(command, "rejected", message, 5),
            MutationOutcome::Failed { error } => Self::api_failure(command, error),
            MutationOutcome::Invalid(error) => {
                Self::failure(command, "invalid_request", error.to_string(), 6)
            }
            MutationOutcome::Cancelled => Self::failure(command, "cancelled", "cancelled by user", 1),
            MutationOutcome::Busy => {
                Self::failure(command, "busy", "another submission is in flight", 1)
            }
        }
    }

    pub fn api_failure(command: &str, error: ApiError) -> Self {
        match error {
            ApiError::Unauthenticated => {
                Self::failure(command, "session", "not signed in; run `reqflow login`", 4)
            }
            ApiError::Rejected(message) => Self::failure(command, "rejected", message, 5),
            other => Self::failure(command, "api", other.to_string(), 5),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Session, transport and cache wired from one loaded config.
pub struct ClientContext {
    pub session: Arc<SessionStore>,
    pub transport: Arc<dyn Transport>,
    pub cache: Arc<QueryCache>,
}

impl ClientContext {
    /// A configured `api.token` takes precedence over the stored session token.
    pub async fn open(command: &str, config: &AppConfig) -> Result<Self, CommandResult> {
        let session = SessionStore::open(&config.session.storage_dir, config.session.token_ttl_days)
            .await
            .map_err(|error| CommandResult::failure(command, "session", error.to_string(), 4))?;
        let session = Arc::new(session);

        let tokens: Arc<dyn TokenSource> = match &config.api.token {
            Some(token) => Arc::new(StaticToken(token.clone())),
            None => session.clone(),
        };
        let transport = HttpTransport::from_config(&config.api, tokens)
            .map_err(|error| CommandResult::failure(command, "transport_init", error.to_string(), 3))?;

        Ok(Self { session, transport: Arc::new(transport), cache: Arc::new(QueryCache::default()) })
    }
}

/// Reads a request document; its `kind` decides the row type.
pub fn read_request_file(command: &str, path: &Path) -> Result<(RequestKind, Value), CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(command, "input", format!("could not read `{}`: {error}", path.display()), 6)
    })?;
    let document: Value = serde_json::from_str(&raw).map_err(|error| {
        CommandResult::failure(command, "input", format!("`{}` is not JSON: {error}", path.display()), 6)
    })?;
    let kind = document
        .get("kind")
        .and_then(Value::as_str)
        .and_then(RequestKind::parse)
        .ok_or_else(|| {
            CommandResult::failure(command, "input", "request file needs a known `kind`", 6)
        })?;
    Ok((kind, document))
}

pub fn decode_request<G: LineItem>(
    command: &str,
    kind: RequestKind,
    document: Value,
) -> Result<Request<G>, CommandResult> {
    serde_json::from_value::<Request<G>>(document)
        .map(|request| request.tagged(kind))
        .map_err(|error| CommandResult::failure(command, "input", error.to_string(), 6))
}
