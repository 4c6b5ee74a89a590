use std::sync::Arc;

use reqflow_core::comments::{add_comment_call, delete_comment_call, update_comment_call};
use reqflow_core::domain::comment::Comment;
use reqflow_core::domain::request::Request;
use reqflow_core::domain::user::User;
use reqflow_core::errors::DomainError;
use reqflow_core::wire::Outbound;
use tracing::info;
use uuid::Uuid;

use crate::api::Transport;
use crate::cache::QueryCache;
use crate::outcome::{alert_on_failure, dispatch, Control, MutationOutcome, PendingControls};
use crate::ui::UiPorts;

/// Comment CRUD on one request's thread; every success refreshes the request detail.
pub struct CommentService {
    transport: Arc<dyn Transport>,
    cache: Arc<QueryCache>,
    ui: UiPorts,
    pending: PendingControls,
}

impl CommentService {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<QueryCache>, ui: UiPorts) -> Self {
        Self { transport, cache, ui, pending: PendingControls::default() }
    }

    pub async fn add<G>(&self, request: &Request<G>, text: &str) -> MutationOutcome {
        let planned = add_comment_call(request, text);
        self.run(request, planned, None).await
    }

    pub async fn update<G>(
        &self,
        request: &Request<G>,
        comment: &Comment,
        current_user: &User,
        text: &str,
    ) -> MutationOutcome {
        let planned = update_comment_call(request, comment, current_user, text);
        self.run(request, planned, None).await
    }

    pub async fn delete<G>(
        &self,
        request: &Request<G>,
        comment: &Comment,
        current_user: &User,
    ) -> MutationOutcome {
        let planned = delete_comment_call(request, comment, current_user);
        self.run(request, planned, Some("Are you sure you want to delete this comment?")).await
    }

    async fn run<G>(
        &self,
        request: &Request<G>,
        planned: Result<Outbound, DomainError>,
        confirmation: Option<&str>,
    ) -> MutationOutcome {
        let Some(_guard) = self.pending.try_begin(Control::Comment) else {
            return MutationOutcome::Busy;
        };
        let call = match planned {
            Ok(call) => call,
            Err(error) => {
                info!(event_name = "comment.refused_locally", error = %error, "no call made");
                self.ui.notifier.error(&error.to_string());
                return MutationOutcome::Invalid(error);
            }
        };
        if let Some(prompt) = confirmation {
            if !self.ui.confirmer.confirm(prompt).await {
                return MutationOutcome::Cancelled;
            }
        }

        let correlation_id = Uuid::new_v4().to_string();
        let outcome =
            dispatch(self.transport.as_ref(), self.ui.notifier.as_ref(), &call, &correlation_id).await;
        if outcome.is_completed() {
            if let Some(id) = &request.id {
                self.cache.invalidate_detail(request.kind, id).await;
            }
        } else if confirmation.is_some() {
            alert_on_failure(self.ui.confirmer.as_ref(), &outcome).await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use reqflow_core::domain::comment::{Comment, CommentId};
    use reqflow_core::domain::item_group::ItemGroup;
    use reqflow_core::domain::request::{Request, RequestId, RequestKind};
    use reqflow_core::domain::user::{Role, UserSummary};
    use reqflow_core::errors::DomainError;
    use reqflow_core::wire::{Endpoint, HttpMethod};
    use serde_json::json;

    use super::CommentService;
    use crate::cache::{QueryCache, QueryKey};
    use crate::outcome::MutationOutcome;
    use crate::testing::{reply, user, RecordingUi, ScriptedTransport};
    use crate::ui::UiPorts;

    fn request() -> Request<ItemGroup> {
        let mut request = Request::new(RequestKind::Payment);
        request.id = Some(RequestId("pay-1".to_owned()));
        request
    }

    fn comment_by(author_id: &str) -> Comment {
        Comment {
            id: CommentId("c-1".to_owned()),
            text: "Attach the invoice".to_owned(),
            user: UserSummary::from(&user(author_id, Role::Reviewer)),
            created_at: Utc::now(),
            edited: false,
            deleted: None,
        }
    }

    type Parts = (Arc<ScriptedTransport>, Arc<RecordingUi>, Arc<QueryCache>, CommentService);

    fn service(ui: RecordingUi) -> Parts {
        service_with(ScriptedTransport::default(), ui)
    }

    fn service_with(transport: ScriptedTransport, ui: RecordingUi) -> Parts {
        let transport = Arc::new(transport);
        let ui = Arc::new(ui);
        let cache = Arc::new(QueryCache::default());
        let service =
            CommentService::new(transport.clone(), cache.clone(), UiPorts::shared(ui.clone()));
        (transport, ui, cache, service)
    }

    #[tokio::test]
    async fn adding_a_comment_refreshes_the_request() {
        let (transport, _ui, cache, service) = service(RecordingUi::confirming());
        let id = RequestId("pay-1".to_owned());
        cache.insert(QueryKey::detail(RequestKind::Payment, &id), json!({})).await;

        assert!(service.add(&request(), "Looks fine").await.is_completed());
        assert_eq!(transport.calls()[0].endpoint, Endpoint::AddComment(RequestKind::Payment, id.clone()));
        assert!(cache.get(&QueryKey::detail(RequestKind::Payment, &id)).await.is_none());
    }

    #[tokio::test]
    async fn cancelled_comment_delete_makes_no_call() {
        let (transport, ui, _cache, service) = service(RecordingUi::declining());
        let author = user("rev-1", Role::Reviewer);

        let outcome = service.delete(&request(), &comment_by("rev-1"), &author).await;
        assert_eq!(outcome, MutationOutcome::Cancelled);
        assert!(transport.calls().is_empty());
        assert_eq!(ui.prompts().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_delete_uses_delete_verb() {
        let (transport, _ui, _cache, service) = service(RecordingUi::confirming());
        let author = user("rev-1", Role::Reviewer);

        assert!(service.delete(&request(), &comment_by("rev-1"), &author).await.is_completed());
        assert_eq!(transport.calls()[0].endpoint.method(), HttpMethod::Delete);
    }

    #[tokio::test]
    async fn rejected_comment_delete_shows_the_server_message_in_a_dialog() {
        let (_transport, ui, _cache, service) = service_with(
            ScriptedTransport::new(vec![reply(json!({"status": 403, "message": "Comment is locked"}))]),
            RecordingUi::confirming(),
        );
        let author = user("rev-1", Role::Reviewer);

        let outcome = service.delete(&request(), &comment_by("rev-1"), &author).await;
        assert_eq!(outcome, MutationOutcome::Rejected { message: "Comment is locked".to_owned() });
        assert_eq!(ui.alerts(), vec!["Comment is locked".to_owned()]);
    }

    #[tokio::test]
    async fn only_the_author_can_edit() {
        let (transport, ui, _cache, service) = service(RecordingUi::confirming());
        let other = user("staff-3", Role::Staff);

        let outcome = service.update(&request(), &comment_by("rev-1"), &other, "changed").await;
        assert_eq!(
            outcome,
            MutationOutcome::Invalid(DomainError::NotCommentAuthor { comment: "c-1".to_owned() })
        );
        assert!(transport.calls().is_empty());
        assert!(ui.prompts().is_empty());
    }
}
