use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use reqflow_core::errors::{ApplicationError, DomainError, InterfaceError};
use reqflow_core::wire::{Outbound, ServerVerdict};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api::{ApiError, Transport};
use crate::ui::{Confirmer, Notifier};

/// What happened to one user-triggered mutation. Failures have already been shown to the user.
#[derive(Clone, Debug, PartialEq)]
pub enum MutationOutcome {
    Completed { message: Option<String>, data: Option<Value> },
    /// 2xx answer whose body status was not 200/201.
    Rejected { message: String },
    Failed { error: ApiError },
    /// Refused locally; no call was made.
    Invalid(DomainError),
    Cancelled,
    /// The same control already has a call in flight.
    Busy,
}

impl MutationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Rejected { .. } => "rejected",
            Self::Failed { .. } => "failed",
            Self::Invalid(_) => "invalid",
            Self::Cancelled => "cancelled",
            Self::Busy => "busy",
        }
    }

    /// Text for the error dialog: the server's message, or the generic transport message.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Self::Rejected { message } => Some(message.clone()),
            Self::Failed { error } => Some(
                InterfaceError::from(ApplicationError::from(error.clone())).user_message().to_owned(),
            ),
            _ => None,
        }
    }
}

/// Confirmation-gated actions report their failure in a dialog as well as the notifier.
pub(crate) async fn alert_on_failure(confirmer: &dyn Confirmer, outcome: &MutationOutcome) {
    if let Some(message) = outcome.failure_message() {
        confirmer.alert(&message).await;
    }
}

pub(crate) async fn dispatch(
    transport: &dyn Transport,
    notifier: &dyn Notifier,
    call: &Outbound,
    correlation_id: &str,
) -> MutationOutcome {
    let path = call.endpoint.path();
    match transport.send(call).await {
        Ok(envelope) => match envelope.verdict() {
            ServerVerdict::Accepted { message, data } => {
                info!(
                    event_name = "client.mutation.completed",
                    path = %path,
                    correlation_id,
                    "mutation accepted"
                );
                if let Some(message) = message.as_deref() {
                    notifier.success(message);
                }
                MutationOutcome::Completed { message, data }
            }
            ServerVerdict::Rejected { message } => {
                warn!(
                    event_name = "client.mutation.rejected",
                    path = %path,
                    correlation_id,
                    message = %message,
                    "mutation rejected by backend"
                );
                notifier.error(&message);
                MutationOutcome::Rejected { message }
            }
        },
        Err(api_error) => {
            error!(
                event_name = "client.mutation.failed",
                path = %path,
                correlation_id,
                error = %api_error,
                "backend call failed"
            );
            let interface = ApplicationError::from(api_error.clone()).into_interface(correlation_id);
            notifier.error(interface.user_message());
            MutationOutcome::Failed { error: api_error }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Control {
    Submit,
    Status,
    Approver,
    CopyTo,
    Delete,
    Comment,
    EmploymentLock,
}

/// At most one in-flight call per control.
#[derive(Debug, Default)]
pub struct PendingControls {
    active: Mutex<HashSet<Control>>,
}

impl PendingControls {
    pub fn try_begin(&self, control: Control) -> Option<PendingGuard<'_>> {
        if !lock(&self.active).insert(control) {
            return None;
        }
        Some(PendingGuard { owner: self, control })
    }

    pub fn is_pending(&self, control: Control) -> bool {
        lock(&self.active).contains(&control)
    }
}

pub struct PendingGuard<'a> {
    owner: &'a PendingControls,
    control: Control,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(&self.owner.active).remove(&self.control);
    }
}

fn lock(active: &Mutex<HashSet<Control>>) -> MutexGuard<'_, HashSet<Control>> {
    match active.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
