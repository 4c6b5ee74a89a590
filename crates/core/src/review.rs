//! Chooses which role selector a request form shows and how it submits.

use serde::Serialize;

use crate::comments::CommentThread;
use crate::domain::comment::Comment;
use crate::domain::request::Request;
use crate::domain::status::RequestStatus;
use crate::domain::user::{User, UserId};
use crate::lifecycle::current_status;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SelectorRole {
    Reviewer,
    Approver,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectorOption {
    pub id: UserId,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoleSelector {
    pub role: SelectorRole,
    pub options: Vec<SelectorOption>,
    pub selected: Option<UserId>,
}

impl RoleSelector {
    fn new(role: SelectorRole, candidates: &[User], selected: Option<UserId>) -> Self {
        let options = candidates
            .iter()
            .map(|user| SelectorOption { id: user.id.clone(), label: user.full_name() })
            .collect();
        Self { role, options, selected }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ReviewPanel {
    /// Unsaved or still-draft request; the reviewer can still be changed.
    ReviewerSelector(RoleSelector),
    /// Already sent: reviewer shown as text.
    ReadOnly {
        reviewer_name: String,
        comments: Vec<Comment>,
        approver_selector: Option<RoleSelector>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SubmitAction {
    Save,
    SaveAndSend,
}

impl SubmitAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Save => "Save",
            Self::SaveAndSend => "Save And Send",
        }
    }
}

pub fn resolve_review_panel<G>(
    request: &Request<G>,
    reviewers: &[User],
    admins: &[User],
) -> ReviewPanel {
    let sent = matches!(current_status(request), Some(status) if status != RequestStatus::Draft);
    let reviewer_id = match request.reviewed_by.as_ref() {
        Some(reviewer_id) if sent => reviewer_id,
        _ => {
            return ReviewPanel::ReviewerSelector(RoleSelector::new(
                SelectorRole::Reviewer,
                reviewers,
                request.reviewed_by.clone(),
            ))
        }
    };

    let reviewer_name = reviewers
        .iter()
        .chain(admins)
        .find(|user| &user.id == reviewer_id)
        .map(User::full_name)
        .unwrap_or_else(|| reviewer_id.to_string());

    let approver_selector = (request.status == RequestStatus::Reviewed)
        .then(|| RoleSelector::new(SelectorRole::Approver, admins, request.approved_by.clone()));

    ReviewPanel::ReadOnly {
        reviewer_name,
        comments: CommentThread::new(request.comments.clone()).visible().cloned().collect(),
        approver_selector,
    }
}

/// "Save" until a reviewer is chosen, "Save And Send" afterwards.
pub fn submit_action<G>(request: &Request<G>) -> SubmitAction {
    if request.has_reviewer() {
        SubmitAction::SaveAndSend
    } else {
        SubmitAction::Save
    }
}
