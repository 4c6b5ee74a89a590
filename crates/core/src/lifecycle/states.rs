use serde::{Deserialize, Serialize};

use crate::domain::request::Request;
use crate::domain::status::RequestStatus;
use crate::domain::user::{User, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleAction {
    Save,
    SaveAndSend,
    AssignApprover,
    SetStatus(RequestStatus),
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::SaveAndSend => "save_and_send",
            Self::AssignApprover => "assign_approver",
            Self::SetStatus(_) => "set_status",
        }
    }
}

/// How many sign-offs a request kind needs after submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStages {
    /// pending -> approved/rejected, set by the reviewer or an admin.
    ReviewerOnly,
    /// pending -> reviewed -> approved/rejected.
    #[default]
    ReviewerThenApprover,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionContext {
    pub actor_id: Option<UserId>,
    pub actor_is_admin: bool,
    pub reviewed_by: Option<UserId>,
    pub approved_by: Option<UserId>,
    pub invalid_fields: Vec<String>,
}

impl TransitionContext {
    pub fn for_request<G>(request: &Request<G>, actor: Option<&User>) -> Self {
        Self {
            actor_id: actor.map(|user| user.id.clone()),
            actor_is_admin: actor.is_some_and(|user| user.role.is_admin()),
            reviewed_by: request.reviewed_by.clone(),
            approved_by: request.approved_by.clone(),
            invalid_fields: Vec::new(),
        }
    }

    pub fn with_invalid_fields(mut self, invalid_fields: Vec<String>) -> Self {
        self.invalid_fields = invalid_fields;
        self
    }

    pub(crate) fn actor_is(&self, assigned: Option<&UserId>) -> bool {
        matches!((self.actor_id.as_ref(), assigned), (Some(actor), Some(assigned)) if actor == assigned)
    }
}

/// Client-side work that follows a successful transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEffect {
    PostDraft,
    PostForReview,
    PatchApprover,
    PatchStatus,
    InvalidateList,
    InvalidateDetail,
    NavigateBack,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: Option<RequestStatus>,
    pub to: RequestStatus,
    pub action: LifecycleAction,
    pub effects: Vec<LifecycleEffect>,
}
