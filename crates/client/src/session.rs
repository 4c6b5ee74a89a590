//! Persisted login state: a cookie jar plus local storage, each a JSON file.
//!
//! Both stores hold `currentLocalUser` and `token-<userId>`. Reads prefer an unexpired
//! cookie and fall back to local storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqflow_core::domain::user::User;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::TokenSource;

pub const CURRENT_USER_KEY: &str = "currentLocalUser";
const COOKIE_FILE: &str = "cookies.json";
const LOCAL_STORAGE_FILE: &str = "local_storage.json";

pub fn token_key(user_id: &str) -> String {
    format!("token-{user_id}")
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not access session file `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("session file `{path}` is not valid JSON: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("could not encode session value: {0}")]
    Encode(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Cookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct SessionState {
    cookies: BTreeMap<String, Cookie>,
    local: BTreeMap<String, String>,
}

pub struct SessionStore {
    dir: PathBuf,
    ttl: Duration,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Opens (or starts) the store under `dir`; expired cookies are dropped on load.
    pub async fn open(dir: impl Into<PathBuf>, ttl_days: i64) -> Result<Self, SessionError> {
        let dir = dir.into();
        let now = Utc::now();
        let mut cookies: BTreeMap<String, Cookie> = read_json(&dir.join(COOKIE_FILE)).await?;
        cookies.retain(|_, cookie| cookie.is_live(now));
        let local = read_json(&dir.join(LOCAL_STORAGE_FILE)).await?;

        Ok(Self {
            dir,
            ttl: Duration::days(ttl_days),
            state: RwLock::new(SessionState { cookies, local }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn persist_login(&self, user: &User, token: &SecretString) -> Result<(), SessionError> {
        let user_json =
            serde_json::to_string(user).map_err(|error| SessionError::Encode(error.to_string()))?;
        let key = token_key(user.id.as_str());
        let expires_at = Utc::now() + self.ttl;

        {
            let mut state = self.state.write().await;
            for (name, value) in [
                (CURRENT_USER_KEY.to_string(), user_json),
                (key, token.expose_secret().to_string()),
            ] {
                state.cookies.insert(
                    name.clone(),
                    Cookie {
                        value: value.clone(),
                        expires_at,
                        secure: true,
                        same_site: SameSite::Strict,
                    },
                );
                state.local.insert(name, value);
            }
        }

        debug!(event_name = "session.login_persisted", user_id = %user.id, "session stored");
        self.flush().await
    }

    /// Refreshes the stored user without touching tokens.
    pub async fn update_user(&self, user: &User) -> Result<(), SessionError> {
        let user_json =
            serde_json::to_string(user).map_err(|error| SessionError::Encode(error.to_string()))?;
        {
            let mut state = self.state.write().await;
            let expires_at = Utc::now() + self.ttl;
            state.cookies.insert(
                CURRENT_USER_KEY.to_string(),
                Cookie { value: user_json.clone(), expires_at, secure: true, same_site: SameSite::Strict },
            );
            state.local.insert(CURRENT_USER_KEY.to_string(), user_json);
        }
        self.flush().await
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current_user_at(Utc::now()).await
    }

    pub async fn token(&self) -> Option<SecretString> {
        self.token_at(Utc::now()).await
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state.write().await;
            state.cookies.clear();
            state.local.clear();
        }
        debug!(event_name = "session.cleared", "session cleared");
        self.flush().await
    }

    pub(crate) async fn current_user_at(&self, now: DateTime<Utc>) -> Option<User> {
        let raw = self.read(CURRENT_USER_KEY, now).await?;
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(error) => {
                warn!(event_name = "session.user_unreadable", error = %error, "ignoring stored user");
                None
            }
        }
    }

    pub(crate) async fn token_at(&self, now: DateTime<Utc>) -> Option<SecretString> {
        let user = self.current_user_at(now).await?;
        self.read(&token_key(user.id.as_str()), now).await.map(SecretString::from)
    }

    async fn read(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        let state = self.state.read().await;
        state
            .cookies
            .get(key)
            .filter(|cookie| cookie.is_live(now))
            .map(|cookie| cookie.value.clone())
            .or_else(|| state.local.get(key).cloned())
    }

    async fn flush(&self) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SessionError::Io { path: self.dir.clone(), source })?;
        let state = self.state.read().await;
        write_json(&self.dir.join(COOKIE_FILE), &state.cookies).await?;
        write_json(&self.dir.join(LOCAL_STORAGE_FILE), &state.local).await
    }
}

#[async_trait]
impl TokenSource for SessionStore {
    async fn bearer_token(&self) -> Option<SecretString> {
        self.token().await
    }
}

async fn read_json<T>(path: &Path) -> Result<T, SessionError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|error| SessionError::Corrupt {
            path: path.to_path_buf(),
            message: error.to_string(),
        }),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(SessionError::Io { path: path.to_path_buf(), source }),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SessionError> {
    let bytes =
        serde_json::to_vec_pretty(value).map_err(|error| SessionError::Encode(error.to_string()))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| SessionError::Io { path: path.to_path_buf(), source })
}
