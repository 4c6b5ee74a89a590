use std::sync::Arc;

use reqflow_client::{LifecycleService, Queries, UiPorts};
use reqflow_core::config::AppConfig;
use reqflow_core::domain::request::{Request, RequestId, RequestKind};
use reqflow_core::domain::status::RequestStatus;
use reqflow_core::lifecycle::LifecycleEngine;
use reqflow_core::wire::StatusUpdate;
use serde_json::Value;

use crate::commands::{ClientContext, CommandResult};
use crate::console::ConsoleUi;

#[derive(Debug, Clone)]
pub struct StatusArgs {
    pub kind: String,
    pub id: String,
    pub status: String,
    pub comment: Option<String>,
    pub assume_yes: bool,
}

pub async fn run(config: &AppConfig, args: StatusArgs) -> CommandResult {
    let Some(kind) = RequestKind::parse(&args.kind) else {
        return CommandResult::failure("status", "input", format!("unknown request kind `{}`", args.kind), 6);
    };
    let Some(status) = RequestStatus::parse(&args.status) else {
        return CommandResult::failure("status", "input", format!("unknown status `{}`", args.status), 6);
    };

    let context = match ClientContext::open("status", config).await {
        Ok(context) => context,
        Err(result) => return result,
    };
    let Some(actor) = context.session.current_user().await else {
        return CommandResult::failure("status", "session", "not signed in; run `reqflow login`", 4);
    };

    // Rows are irrelevant to a status change.
    let queries = Queries::new(context.transport.clone(), context.cache.clone());
    let request: Request<Value> =
        match queries.fetch(kind, &RequestId(args.id.trim().to_string())).await {
            Ok(request) => request,
            Err(error) => return CommandResult::api_failure("status", error),
        };

    let service = LifecycleService::new(
        context.transport,
        context.cache,
        UiPorts::shared(Arc::new(ConsoleUi::new(args.assume_yes))),
        LifecycleEngine::new(config.lifecycle.policy()),
    );
    let comment = args.comment.filter(|comment| !comment.trim().is_empty());
    let outcome = service.update_status(&request, &actor, StatusUpdate { status, comment }).await;
    CommandResult::from_outcome("status", outcome)
}
