//! Turns a gated lifecycle action into the call the backend expects.

use serde_json::json;

use crate::domain::item_group::LineItem;
use crate::domain::request::{Request, RequestId};
use crate::domain::user::{User, UserId};
use crate::draft::DraftStore;
use crate::errors::DomainError;
use crate::lifecycle::engine::LifecycleEngine;
use crate::lifecycle::states::{LifecycleAction, TransitionContext, TransitionOutcome};
use crate::review::{submit_action, SubmitAction};
use crate::wire::{request_form_fields, request_json, Attachment, Endpoint, Outbound, Payload, StatusUpdate};

#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub outcome: TransitionOutcome,
    pub call: Outbound,
}

/// Save when no reviewer is chosen, Save And Send otherwise.
pub fn plan_submission<G: LineItem>(
    engine: &LifecycleEngine,
    store: &DraftStore<G>,
    files: Vec<Attachment>,
) -> Result<Submission, DomainError> {
    match submit_action(store.request()) {
        SubmitAction::Save => plan_save(engine, store, files),
        SubmitAction::SaveAndSend => plan_send(engine, store, files),
    }
}

/// Draft save; JSON unless attachments ride along.
pub fn plan_save<G: LineItem>(
    engine: &LifecycleEngine,
    store: &DraftStore<G>,
    files: Vec<Attachment>,
) -> Result<Submission, DomainError> {
    let request = store.snapshot();
    let context = TransitionContext::for_request(&request, None);
    let outcome = engine.apply_to_request(&request, LifecycleAction::Save, &context)?;

    let payload = if files.is_empty() {
        Payload::Json(request_json(&request)?)
    } else {
        Payload::Multipart { fields: request_form_fields(&request)?, files }
    };
    Ok(Submission { outcome, call: Outbound { endpoint: Endpoint::Save(request.kind), payload } })
}

/// Submission for review; always multipart.
pub fn plan_send<G: LineItem>(
    engine: &LifecycleEngine,
    store: &DraftStore<G>,
    files: Vec<Attachment>,
) -> Result<Submission, DomainError> {
    let request = store.snapshot();
    let invalid_fields = store.validate().into_iter().map(|issue| issue.field).collect();
    let context =
        TransitionContext::for_request(&request, None).with_invalid_fields(invalid_fields);
    let outcome = engine.apply_to_request(&request, LifecycleAction::SaveAndSend, &context)?;

    let payload = Payload::Multipart { fields: request_form_fields(&request)?, files };
    Ok(Submission {
        outcome,
        call: Outbound { endpoint: Endpoint::SaveAndSend(request.kind), payload },
    })
}

pub fn plan_status_update<G>(
    engine: &LifecycleEngine,
    request: &Request<G>,
    actor: &User,
    update: StatusUpdate,
) -> Result<Submission, DomainError> {
    let id = saved_id(request)?;
    let context = TransitionContext::for_request(request, Some(actor));
    let outcome =
        engine.apply_to_request(request, LifecycleAction::SetStatus(update.status), &context)?;
    let body = serde_json::to_value(&update)
        .map_err(|error| DomainError::InvariantViolation(error.to_string()))?;

    Ok(Submission {
        outcome,
        call: Outbound::json(Endpoint::UpdateStatus(request.kind, id.clone()), body),
    })
}

pub fn plan_approver_assignment<G>(
    engine: &LifecycleEngine,
    request: &Request<G>,
    actor: &User,
    approver: &UserId,
) -> Result<Submission, DomainError> {
    let id = saved_id(request)?;
    let mut context = TransitionContext::for_request(request, Some(actor));
    context.approved_by = Some(approver.clone());
    let outcome = engine.apply_to_request(request, LifecycleAction::AssignApprover, &context)?;

    Ok(Submission {
        outcome,
        call: Outbound::json(
            Endpoint::Update(request.kind),
            json!({ "id": id.0, "approvedBy": approver.0 }),
        ),
    })
}

pub fn copy_to_call<G>(request: &Request<G>, user_ids: &[UserId]) -> Result<Outbound, DomainError> {
    let id = saved_id(request)?;
    Ok(Outbound::json(Endpoint::CopyTo(request.kind, id.clone()), json!({ "userIds": user_ids })))
}

pub fn delete_call<G>(request: &Request<G>) -> Result<Outbound, DomainError> {
    let id = saved_id(request)?;
    Ok(Outbound::bodyless(Endpoint::Delete(request.kind, id.clone())))
}

pub(crate) fn saved_id<G>(request: &Request<G>) -> Result<&RequestId, DomainError> {
    request.id.as_ref().ok_or_else(|| {
        DomainError::InvariantViolation("request has not been saved yet".to_string())
    })
}
