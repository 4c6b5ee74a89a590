//! Audit trail for lifecycle transitions, one event per evaluated or dispatched mutation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::request::{Request, RequestId, RequestKind};
use crate::domain::status::RequestStatus;
use crate::lifecycle::LifecycleAction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Who triggered the mutation and under which correlation id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditContext {
    pub request_id: Option<RequestId>,
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(
        request_id: Option<RequestId>,
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self { request_id, correlation_id: correlation_id.into(), actor: actor.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub kind: RequestKind,
    /// `None` until the backend has assigned an id.
    pub request_id: Option<RequestId>,
    pub correlation_id: String,
    pub actor: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn for_request<G>(
        request: &Request<G>,
        event_type: impl Into<String>,
        context: &AuditContext,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            kind: request.kind,
            request_id: context.request_id.clone().or_else(|| request.id.clone()),
            correlation_id: context.correlation_id.clone(),
            actor: context.actor.clone(),
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    /// Records `from` and `to` as wire status names; an unsaved request starts from "new".
    pub fn with_transition(self, from: Option<RequestStatus>, to: RequestStatus) -> Self {
        self.with_metadata("from", from.map_or("new", |status| status.as_str()))
            .with_metadata("to", to.as_str())
    }

    pub fn with_action(self, action: LifecycleAction) -> Self {
        self.with_metadata("action", action.as_str())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Writes each event as a structured tracing record.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        tracing::info!(
            event_name = %event.event_type,
            kind = event.kind.as_str(),
            outcome = event.outcome.as_str(),
            request_id = event.request_id.as_ref().map_or("unsaved", |id| id.0.as_str()),
            correlation_id = %event.correlation_id,
            actor = %event.actor,
            metadata = ?event.metadata,
            "audit event"
        );
    }
}

/// Keeps events in memory so tests can assert on them.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
