use async_trait::async_trait;
use reqflow_core::errors::ApplicationError;
use reqflow_core::wire::{Outbound, ResponseEnvelope};
use secrecy::SecretString;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("server answered HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("server rejected the call: {0}")]
    Rejected(String),
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("response could not be decoded: {0}")]
    Decode(String),
    #[error("no session token is available")]
    Unauthenticated,
}

impl From<ApiError> for ApplicationError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthenticated => Self::Session(error.to_string()),
            other => Self::Integration(other.to_string()),
        }
    }
}

/// Sends one backend call and returns the decoded body of a 2xx response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, call: &Outbound) -> Result<ResponseEnvelope, ApiError>;
}

/// Supplies the bearer token for authenticated calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Option<SecretString>;
}

/// A fixed token, e.g. from `REQFLOW_API_TOKEN`.
pub struct StaticToken(pub SecretString);

#[async_trait]
impl TokenSource for StaticToken {
    async fn bearer_token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

pub struct NoToken;

#[async_trait]
impl TokenSource for NoToken {
    async fn bearer_token(&self) -> Option<SecretString> {
        None
    }
}
