use std::sync::Arc;

use reqflow_core::domain::user::User;
use reqflow_core::errors::ApplicationError;
use reqflow_core::wire::{Endpoint, Outbound, ServerVerdict};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use crate::api::{ApiError, Transport};
use crate::session::{SessionError, SessionStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    Rejected(String),
    #[error("login response did not contain a user and token: {0}")]
    MalformedResponse(String),
}

impl From<AuthError> for ApplicationError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Api(api) => api.into(),
            other => Self::Session(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct LoginData {
    user: User,
    #[serde(alias = "accessToken")]
    token: String,
}

pub struct AuthService {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, AuthError> {
        let call = Outbound::json(
            Endpoint::Login,
            json!({ "email": email.trim(), "password": password.expose_secret() }),
        );
        let data = accepted_data(self.transport.send(&call).await?.verdict())?;
        let login: LoginData = serde_json::from_value(data)
            .map_err(|error| AuthError::MalformedResponse(error.to_string()))?;

        let token = SecretString::from(login.token);
        self.session.persist_login(&login.user, &token).await?;
        info!(event_name = "session.logged_in", user_id = %login.user.id, "login succeeded");
        Ok(login.user)
    }

    /// Reloads the signed-in user and refreshes the stored copy.
    pub async fn me(&self) -> Result<User, AuthError> {
        let data = accepted_data(self.transport.send(&Outbound::bodyless(Endpoint::Me)).await?.verdict())?;
        let user: User = serde_json::from_value(data)
            .map_err(|error| AuthError::MalformedResponse(error.to_string()))?;
        self.session.update_user(&user).await?;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.session.clear().await?;
        info!(event_name = "session.logged_out", "logout completed");
        Ok(())
    }
}

fn accepted_data(verdict: ServerVerdict) -> Result<Value, AuthError> {
    match verdict {
        ServerVerdict::Accepted { data: Some(data), .. } => Ok(data),
        ServerVerdict::Accepted { data: None, .. } => {
            Err(AuthError::MalformedResponse("empty body".to_string()))
        }
        ServerVerdict::Rejected { message } => Err(AuthError::Rejected(message)),
    }
}
