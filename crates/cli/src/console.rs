//! Terminal rendition of the notifier, confirmer and navigator seams.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use reqflow_client::ui::{Confirmer, Navigator, Notifier};
use tracing::debug;

pub struct ConsoleUi {
    assume_yes: bool,
}

impl ConsoleUi {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Notifier for ConsoleUi {
    fn success(&self, message: &str) {
        eprintln!("ok: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[async_trait]
impl Confirmer for ConsoleUi {
    async fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = prompt.to_owned();
        tokio::task::spawn_blocking(move || ask(&prompt)).await.unwrap_or(false)
    }

    async fn alert(&self, message: &str) {
        if self.assume_yes {
            debug!(event_name = "cli.alert_skipped", alert = message, "non-interactive run");
            return;
        }
        let message = message.to_owned();
        if tokio::task::spawn_blocking(move || acknowledge(&message)).await.is_err() {
            debug!(event_name = "cli.alert_aborted", "error dialog was not acknowledged");
        }
    }
}

impl Navigator for ConsoleUi {
    fn back(&self) {
        debug!(event_name = "cli.navigate_back", "nothing to navigate in a one-shot command");
    }
}

fn ask(prompt: &str) -> bool {
    let mut stderr = io::stderr();
    if write!(stderr, "{prompt} [y/N] ").and_then(|()| stderr.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn acknowledge(message: &str) {
    let mut stderr = io::stderr();
    if write!(stderr, "error: {message} [press enter] ").and_then(|()| stderr.flush()).is_err() {
        return;
    }
    let mut ignored = String::new();
    let _ = io::stdin().lock().read_line(&mut ignored);
}
