use std::env;

use reqflow_client::{AuthError, AuthService};
use reqflow_core::config::AppConfig;
use reqflow_core::domain::user::User;
use secrecy::SecretString;

use crate::commands::{ClientContext, CommandResult};

pub async fn login(config: &AppConfig, email: &str, password: Option<String>) -> CommandResult {
    let Some(password) = password.or_else(|| env::var("REQFLOW_PASSWORD").ok()) else {
        return CommandResult::failure("login", "input", "pass --password or set REQFLOW_PASSWORD", 6);
    };
    let context = match ClientContext::open("login", config).await {
        Ok(context) => context,
        Err(result) => return result,
    };

    let auth = AuthService::new(context.transport, context.session);
    match auth.login(email, &SecretString::from(password)).await {
        Ok(user) => CommandResult::success("login", format!("signed in as {}", describe(&user))),
        Err(error) => auth_failure("login", error),
    }
}

pub async fn whoami(config: &AppConfig, refresh: bool) -> CommandResult {
    let context = match ClientContext::open("whoami", config).await {
        Ok(context) => context,
        Err(result) => return result,
    };

    if refresh {
        let auth = AuthService::new(context.transport, context.session);
        return match auth.me().await {
            Ok(user) => CommandResult::success("whoami", describe(&user)),
            Err(error) => auth_failure("whoami", error),
        };
    }

    match context.session.current_user().await {
        Some(user) => CommandResult::success("whoami", describe(&user)),
        None => CommandResult::failure("whoami", "session", "not signed in", 4),
    }
}

pub async fn logout(config: &AppConfig) -> CommandResult {
    let context = match ClientContext::open("logout", config).await {
        Ok(context) => context,
        Err(result) => return result,
    };
    match AuthService::new(context.transport, context.session).logout().await {
        Ok(()) => CommandResult::success("logout", "session cleared"),
        Err(error) => auth_failure("logout", error),
    }
}

fn describe(user: &User) -> String {
    format!("{} ({}, {:?})", user.full_name(), user.id, user.role)
}

fn auth_failure(command: &str, error: AuthError) -> CommandResult {
    match error {
        AuthError::Api(api) => CommandResult::api_failure(command, api),
        AuthError::Rejected(message) => CommandResult::failure(command, "rejected", message, 5),
        other => CommandResult::failure(command, "session", other.to_string(), 4),
    }
}
