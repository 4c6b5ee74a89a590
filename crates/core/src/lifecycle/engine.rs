use std::collections::BTreeMap;

use tracing::debug;

use crate::audit::{AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::request::{Request, RequestKind};
use crate::domain::status::RequestStatus;
use crate::domain::user::User;
use crate::errors::DomainError;
use crate::lifecycle::states::{
    ApprovalStages, LifecycleAction, LifecycleEffect, TransitionContext, TransitionOutcome,
};

pub trait LifecycleDefinition {
    fn stages(&self) -> ApprovalStages;
    fn transition(
        &self,
        current: Option<RequestStatus>,
        action: LifecycleAction,
        context: &TransitionContext,
    ) -> Result<TransitionOutcome, DomainError>;
}

#[derive(Clone, Debug, Default)]
pub struct ReviewerThenApproverLifecycle;

impl LifecycleDefinition for ReviewerThenApproverLifecycle {
    fn stages(&self) -> ApprovalStages {
        ApprovalStages::ReviewerThenApprover
    }

    fn transition(
        &self,
        current: Option<RequestStatus>,
        action: LifecycleAction,
        context: &TransitionContext,
    ) -> Result<TransitionOutcome, DomainError> {
        use LifecycleAction::{AssignApprover, SetStatus};
        use RequestStatus::{Approved, Pending, Rejected, Reviewed};

        if let Some(outcome) = submit_transition(current, action, context)? {
            return Ok(outcome);
        }

        let (to, effects) = match (current, action) {
            (Some(Pending), SetStatus(next @ (Reviewed | Rejected))) => {
                require_actor(context.actor_is(context.reviewed_by.as_ref()), context, Pending)?;
                (next, status_effects())
            }
            (Some(Reviewed), AssignApprover) => {
                if context.approved_by.is_none() {
                    return Err(DomainError::ApproverRequired);
                }
                (Reviewed, vec![LifecycleEffect::PatchApprover, LifecycleEffect::InvalidateDetail])
            }
            (Some(Reviewed), SetStatus(next @ (Approved | Rejected))) => {
                let allowed =
                    context.actor_is(context.approved_by.as_ref()) || context.actor_is_admin;
                require_actor(allowed, context, Reviewed)?;
                (next, status_effects())
            }
            _ => return Err(DomainError::InvalidTransition { from: current, action }),
        };

        Ok(TransitionOutcome { from: current, to, action, effects })
    }
}

/// Single sign-off chain: the reviewer (or an admin) settles the request directly.
#[derive(Clone, Debug, Default)]
pub struct ReviewerOnlyLifecycle;

impl LifecycleDefinition for ReviewerOnlyLifecycle {
    fn stages(&self) -> ApprovalStages {
        ApprovalStages::ReviewerOnly
    }

    fn transition(
        &self,
        current: Option<RequestStatus>,
        action: LifecycleAction,
        context: &TransitionContext,
    ) -> Result<TransitionOutcome, DomainError> {
        use RequestStatus::{Approved, Pending, Rejected};

        if let Some(outcome) = submit_transition(current, action, context)? {
            return Ok(outcome);
        }

        let (to, effects) = match (current, action) {
            (Some(Pending), LifecycleAction::SetStatus(next @ (Approved | Rejected))) => {
                let allowed =
                    context.actor_is(context.reviewed_by.as_ref()) || context.actor_is_admin;
                require_actor(allowed, context, Pending)?;
                (next, status_effects())
            }
            _ => return Err(DomainError::InvalidTransition { from: current, action }),
        };

        Ok(TransitionOutcome { from: current, to, action, effects })
    }
}

/// Save / Save And Send are shared by every chain.
fn submit_transition(
    current: Option<RequestStatus>,
    action: LifecycleAction,
    context: &TransitionContext,
) -> Result<Option<TransitionOutcome>, DomainError> {
    use LifecycleEffect::{InvalidateList, NavigateBack, PostDraft, PostForReview};

    let editable = matches!(current, None | Some(RequestStatus::Draft));
    let (to, effects) = match action {
        LifecycleAction::Save if editable => {
            (RequestStatus::Draft, vec![PostDraft, InvalidateList, NavigateBack])
        }
        LifecycleAction::SaveAndSend if editable => {
            if context.reviewed_by.is_none() {
                return Err(DomainError::ReviewerRequired);
            }
            if !context.invalid_fields.is_empty() {
                return Err(DomainError::InvalidFields(context.invalid_fields.clone()));
            }
            (RequestStatus::Pending, vec![PostForReview, InvalidateList, NavigateBack])
        }
        _ => return Ok(None),
    };

    Ok(Some(TransitionOutcome { from: current, to, action, effects }))
}

fn require_actor(
    allowed: bool,
    context: &TransitionContext,
    status: RequestStatus,
) -> Result<(), DomainError> {
    if allowed {
        return Ok(());
    }
    Err(DomainError::ActorNotAssigned {
        actor: context.actor_id.as_ref().map(ToString::to_string).unwrap_or_default(),
        status,
    })
}

fn status_effects() -> Vec<LifecycleEffect> {
    vec![LifecycleEffect::PatchStatus, LifecycleEffect::InvalidateDetail]
}

/// Approval-chain length per request kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LifecyclePolicy {
    overrides: BTreeMap<RequestKind, ApprovalStages>,
}

impl LifecyclePolicy {
    pub fn with_stages(mut self, kind: RequestKind, stages: ApprovalStages) -> Self {
        self.overrides.insert(kind, stages);
        self
    }

    pub fn reviewer_only(kinds: impl IntoIterator<Item = RequestKind>) -> Self {
        kinds
            .into_iter()
            .fold(Self::default(), |policy, kind| policy.with_stages(kind, ApprovalStages::ReviewerOnly))
    }

    pub fn stages_for(&self, kind: RequestKind) -> ApprovalStages {
        self.overrides.get(&kind).copied().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct LifecycleEngine {
    policy: LifecyclePolicy,
}

impl LifecycleEngine {
    pub fn new(policy: LifecyclePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub fn apply(
        &self,
        kind: RequestKind,
        current: Option<RequestStatus>,
        action: LifecycleAction,
        context: &TransitionContext,
    ) -> Result<TransitionOutcome, DomainError> {
        let result = match self.policy.stages_for(kind) {
            ApprovalStages::ReviewerOnly => {
                ReviewerOnlyLifecycle.transition(current, action, context)
            }
            ApprovalStages::ReviewerThenApprover => {
                ReviewerThenApproverLifecycle.transition(current, action, context)
            }
        };
        debug!(
            event_name = "lifecycle.transition_evaluated",
            request_kind = %kind,
            action = ?action,
            accepted = result.is_ok(),
            "lifecycle transition evaluated"
        );
        result
    }

    pub fn apply_to_request<G>(
        &self,
        request: &Request<G>,
        action: LifecycleAction,
        context: &TransitionContext,
    ) -> Result<TransitionOutcome, DomainError> {
        self.apply(request.kind, current_status(request), action, context)
    }

    pub fn apply_with_audit<G, S>(
        &self,
        request: &Request<G>,
        action: LifecycleAction,
        context: &TransitionContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, DomainError>
    where
        S: AuditSink,
    {
        let result = self.apply_to_request(request, action, context);
        let event = match &result {
            Ok(outcome) => AuditEvent::for_request(
                request,
                "lifecycle.transition_applied",
                audit,
                AuditOutcome::Success,
            )
            .with_transition(outcome.from, outcome.to)
            .with_action(outcome.action),
            Err(error) => AuditEvent::for_request(
                request,
                "lifecycle.transition_rejected",
                audit,
                AuditOutcome::Rejected,
            )
            .with_action(action)
            .with_metadata("error", error.to_string()),
        };
        sink.emit(event);
        result
    }

    /// Statuses the actor may set right now; empty means the control is not rendered.
    pub fn status_options<G>(&self, request: &Request<G>, actor: &User) -> Vec<RequestStatus> {
        let context = TransitionContext::for_request(request, Some(actor));
        [RequestStatus::Reviewed, RequestStatus::Approved, RequestStatus::Rejected]
            .into_iter()
            .filter(|next| {
                self.apply_to_request(request, LifecycleAction::SetStatus(*next), &context).is_ok()
            })
            .collect()
    }

    pub fn can_update_status<G>(&self, request: &Request<G>, actor: &User) -> bool {
        !self.status_options(request, actor).is_empty()
    }
}

/// Unsaved requests have no status yet.
pub fn current_status<G>(request: &Request<G>) -> Option<RequestStatus> {
    request.id.as_ref().map(|_| request.status)
}
