use std::path::Path;

use reqflow_core::domain::item_group::{ItemGroup, LineItem, TravelItemGroup};
use reqflow_core::domain::request::RequestKind;
use reqflow_core::draft::DraftStore;
use serde_json::Value;

use crate::commands::{decode_request, read_request_file, CommandResult};

/// Offline: recomputes every row total and the budget from the file's inputs.
pub fn run(path: &Path) -> CommandResult {
    let (kind, document) = match read_request_file("totals", path) {
        Ok(parsed) => parsed,
        Err(result) => return result,
    };
    if kind.uses_travel_rows() {
        summarize::<TravelItemGroup>(kind, document)
    } else {
        summarize::<ItemGroup>(kind, document)
    }
}

fn summarize<G: LineItem>(kind: RequestKind, document: Value) -> CommandResult {
    let request = match decode_request::<G>("totals", kind, document) {
        Ok(request) => request,
        Err(result) => return result,
    };
    let store = DraftStore::new(request, Vec::new());

    let mut lines: Vec<String> = store
        .rows()
        .iter()
        .enumerate()
        .map(|(index, editable)| {
            format!("{}. {} = {}", index + 1, editable.row.label(), editable.row.total())
        })
        .collect();
    lines.push(format!("budget = {}", store.budget()));
    CommandResult::success("totals", lines.join("\n"))
}
