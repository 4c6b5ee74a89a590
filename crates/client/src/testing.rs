//! In-memory doubles for the transport and UI seams, shared by unit and integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqflow_core::domain::user::{EmploymentInfo, PermissionSet, Role, User, UserId};
use reqflow_core::wire::{Outbound, ResponseEnvelope};
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::api::{ApiError, Transport};
use crate::ui::{Confirmer, Navigator, Notifier};

pub fn user(id: &str, role: Role) -> User {
    User {
        id: UserId(id.to_owned()),
        first_name: format!("{id}-first"),
        last_name: format!("{id}-last"),
        email: Some(format!("{id}@example.org")),
        role,
        procurement_role: PermissionSet::default(),
        finance_role: PermissionSet::default(),
        employment_info: EmploymentInfo::default(),
    }
}

pub fn reply(body: Value) -> Result<ResponseEnvelope, ApiError> {
    Ok(ResponseEnvelope::from_body(body))
}

#[derive(Default)]
struct ScriptedState {
    responses: VecDeque<Result<ResponseEnvelope, ApiError>>,
    calls: Vec<Outbound>,
}

/// Replays queued responses; once empty it answers `{"status": 200}`.
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptedState>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<ResponseEnvelope, ApiError>>) -> Self {
        Self {
            state: Mutex::new(ScriptedState { responses: responses.into(), calls: Vec::new() }),
            gate: None,
        }
    }

    /// Every call waits for one `notify_one` on `gate` before answering.
    pub fn gated(responses: Vec<Result<ResponseEnvelope, ApiError>>, gate: Arc<Notify>) -> Self {
        Self { gate: Some(gate), ..Self::new(responses) }
    }

    pub fn calls(&self) -> Vec<Outbound> {
        lock(&self.state).calls.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, call: &Outbound) -> Result<ResponseEnvelope, ApiError> {
        let response = {
            let mut state = lock(&self.state);
            state.calls.push(call.clone());
            state.responses.pop_front()
        };
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        response.unwrap_or_else(|| reply(json!({"status": 200})))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Records notices, dialogs and navigation; answers every confirmation the same way.
pub struct RecordingUi {
    answer: bool,
    notices: Mutex<Vec<Notice>>,
    prompts: Mutex<Vec<String>>,
    alerts: Mutex<Vec<String>>,
    back: AtomicUsize,
}

impl RecordingUi {
    pub fn confirming() -> Self {
        Self::answering(true)
    }

    pub fn declining() -> Self {
        Self::answering(false)
    }

    fn answering(answer: bool) -> Self {
        Self {
            answer,
            notices: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            back: AtomicUsize::new(0),
        }
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        lock(&self.alerts).clone()
    }

    pub fn back_count(&self) -> usize {
        self.back.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingUi {
    fn success(&self, message: &str) {
        lock(&self.notices).push(Notice::Success(message.to_owned()));
    }

    fn error(&self, message: &str) {
        lock(&self.notices).push(Notice::Error(message.to_owned()));
    }
}

#[async_trait]
impl Confirmer for RecordingUi {
    async fn confirm(&self, prompt: &str) -> bool {
        lock(&self.prompts).push(prompt.to_owned());
        self.answer
    }

    async fn alert(&self, message: &str) {
        lock(&self.alerts).push(message.to_owned());
    }
}

impl Navigator for RecordingUi {
    fn back(&self) {
        self.back.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
