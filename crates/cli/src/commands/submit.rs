use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqflow_client::{LifecycleService, UiPorts};
use reqflow_core::config::AppConfig;
use reqflow_core::domain::item_group::{ItemGroup, LineItem, TravelItemGroup};
use reqflow_core::domain::request::RequestKind;
use reqflow_core::draft::DraftStore;
use reqflow_core::lifecycle::LifecycleEngine;
use reqflow_core::wire::Attachment;
use serde_json::Value;
use tracing::info;

use crate::commands::{decode_request, read_request_file, ClientContext, CommandResult};
use crate::console::ConsoleUi;

pub async fn run(config: &AppConfig, path: &Path, attachments: &[PathBuf]) -> CommandResult {
    let (kind, document) = match read_request_file("submit", path) {
        Ok(parsed) => parsed,
        Err(result) => return result,
    };
    let files = match read_attachments(attachments).await {
        Ok(files) => files,
        Err(result) => return result,
    };
    let context = match ClientContext::open("submit", config).await {
        Ok(context) => context,
        Err(result) => return result,
    };
    let service = LifecycleService::new(
        context.transport,
        context.cache,
        UiPorts::shared(Arc::new(ConsoleUi::new(true))),
        LifecycleEngine::new(config.lifecycle.policy()),
    );

    info!(event_name = "cli.submit.started", kind = %kind, attachments = files.len(), "submitting request file");
    if kind.uses_travel_rows() {
        submit::<TravelItemGroup>(&service, kind, document, files).await
    } else {
        submit::<ItemGroup>(&service, kind, document, files).await
    }
}

async fn submit<G: LineItem>(
    service: &LifecycleService,
    kind: RequestKind,
    document: Value,
    files: Vec<Attachment>,
) -> CommandResult {
    let request = match decode_request::<G>("submit", kind, document) {
        Ok(request) => request,
        Err(result) => return result,
    };
    let store = DraftStore::new(request, Vec::new());
    CommandResult::from_outcome("submit", service.submit(&store, files).await)
}

async fn read_attachments(paths: &[PathBuf]) -> Result<Vec<Attachment>, CommandResult> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await.map_err(|error| {
            CommandResult::failure(
                "submit",
                "input",
                format!("could not read attachment `{}`: {error}", path.display()),
                6,
            )
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        files.push(Attachment { content_type: content_type_for(path).to_string(), file_name, bytes });
    }
    Ok(files)
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
