use std::sync::Arc;

use reqflow_core::audit::{AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink};
use reqflow_core::domain::item_group::LineItem;
use reqflow_core::domain::request::Request;
use reqflow_core::domain::user::{User, UserId};
use reqflow_core::draft::DraftStore;
use reqflow_core::errors::DomainError;
use reqflow_core::lifecycle::{
    copy_to_call, delete_call, plan_approver_assignment, plan_save, plan_send, plan_status_update,
    plan_submission, LifecycleEffect, LifecycleEngine, Submission,
};
use reqflow_core::wire::{Attachment, Outbound, StatusUpdate};
use tracing::info;
use uuid::Uuid;

use crate::api::Transport;
use crate::cache::QueryCache;
use crate::outcome::{alert_on_failure, dispatch, Control, MutationOutcome, PendingControls};
use crate::ui::UiPorts;

/// Runs lifecycle transitions against the backend.
pub struct LifecycleService {
    transport: Arc<dyn Transport>,
    cache: Arc<QueryCache>,
    ui: UiPorts,
    engine: LifecycleEngine,
    audit: Arc<dyn AuditSink>,
    pending: PendingControls,
}

impl LifecycleService {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<QueryCache>,
        ui: UiPorts,
        engine: LifecycleEngine,
    ) -> Self {
        Self {
            transport,
            cache,
            ui,
            engine,
            audit: Arc::new(TracingAuditSink),
            pending: PendingControls::default(),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub fn is_pending(&self, control: Control) -> bool {
        self.pending.is_pending(control)
    }

    /// Save or Save And Send, whichever the reviewer selection calls for.
    pub async fn submit<G: LineItem>(
        &self,
        store: &DraftStore<G>,
        files: Vec<Attachment>,
    ) -> MutationOutcome {
        let plan = plan_submission(&self.engine, store, files);
        self.run_submission(Control::Submit, store.request(), plan, None, None).await
    }

    pub async fn save<G: LineItem>(&self, store: &DraftStore<G>) -> MutationOutcome {
        let plan = plan_save(&self.engine, store, Vec::new());
        self.run_submission(Control::Submit, store.request(), plan, None, None).await
    }

    pub async fn send_for_review<G: LineItem>(
        &self,
        store: &DraftStore<G>,
        files: Vec<Attachment>,
    ) -> MutationOutcome {
        let plan = plan_send(&self.engine, store, files);
        self.run_submission(Control::Submit, store.request(), plan, None, None).await
    }

    /// Confirmation-gated status change.
    pub async fn update_status<G>(
        &self,
        request: &Request<G>,
        actor: &User,
        update: StatusUpdate,
    ) -> MutationOutcome {
        let prompt = format!("Are you sure you want to mark this request as {}?", update.status);
        let plan = plan_status_update(&self.engine, request, actor, update);
        self.run_submission(Control::Status, request, plan, Some(prompt), Some(actor)).await
    }

    pub async fn assign_approver<G>(
        &self,
        request: &Request<G>,
        actor: &User,
        approver: &UserId,
    ) -> MutationOutcome {
        let plan = plan_approver_assignment(&self.engine, request, actor, approver);
        self.run_submission(Control::Approver, request, plan, None, Some(actor)).await
    }

    pub async fn copy_to<G>(&self, request: &Request<G>, user_ids: &[UserId]) -> MutationOutcome {
        let Some(_guard) = self.pending.try_begin(Control::CopyTo) else {
            return MutationOutcome::Busy;
        };
        let call = match copy_to_call(request, user_ids) {
            Ok(call) => call,
            Err(error) => return self.refuse(error),
        };
        let outcome = self.send(request, None, &call, "lifecycle.copied_to").await;
        if outcome.is_completed() {
            self.apply_effects(request, &[LifecycleEffect::InvalidateDetail]).await;
        }
        outcome
    }

    /// Confirmation-gated delete; cancelling makes no call.
    pub async fn delete<G>(&self, request: &Request<G>) -> MutationOutcome {
        let Some(_guard) = self.pending.try_begin(Control::Delete) else {
            return MutationOutcome::Busy;
        };
        let call = match delete_call(request) {
            Ok(call) => call,
            Err(error) => return self.refuse(error),
        };
        if !self.ui.confirmer.confirm("Are you sure you want to delete this request?").await {
            return MutationOutcome::Cancelled;
        }
        let outcome = self.send(request, None, &call, "lifecycle.deleted").await;
        if outcome.is_completed() {
            self.apply_effects(
                request,
                &[LifecycleEffect::InvalidateList, LifecycleEffect::NavigateBack],
            )
            .await;
        } else {
            alert_on_failure(self.ui.confirmer.as_ref(), &outcome).await;
        }
        outcome
    }

    async fn run_submission<G>(
        &self,
        control: Control,
        request: &Request<G>,
        plan: Result<Submission, DomainError>,
        confirmation: Option<String>,
        actor: Option<&User>,
    ) -> MutationOutcome {
        let Some(_guard) = self.pending.try_begin(control) else {
            return MutationOutcome::Busy;
        };
        let submission = match plan {
            Ok(submission) => submission,
            Err(error) => return self.refuse(error),
        };
        if let Some(prompt) = &confirmation {
            if !self.ui.confirmer.confirm(prompt).await {
                return MutationOutcome::Cancelled;
            }
        }

        let event_type = format!("lifecycle.{}", submission.outcome.to.as_str());
        let outcome = self.send(request, actor, &submission.call, &event_type).await;
        if outcome.is_completed() {
            self.apply_effects(request, &submission.outcome.effects).await;
        } else if confirmation.is_some() {
            alert_on_failure(self.ui.confirmer.as_ref(), &outcome).await;
        }
        outcome
    }

    async fn send<G>(
        &self,
        request: &Request<G>,
        actor: Option<&User>,
        call: &Outbound,
        event_type: &str,
    ) -> MutationOutcome {
        let correlation_id = Uuid::new_v4().to_string();
        let outcome =
            dispatch(self.transport.as_ref(), self.ui.notifier.as_ref(), call, &correlation_id).await;
        let audit_outcome = match &outcome {
            MutationOutcome::Completed { .. } => AuditOutcome::Success,
            MutationOutcome::Rejected { .. } => AuditOutcome::Rejected,
            _ => AuditOutcome::Failed,
        };
        let actor = actor.map(|user| user.id.to_string()).unwrap_or_else(|| "session".to_string());
        let context = AuditContext::new(request.id.clone(), correlation_id, actor);
        self.audit.emit(
            AuditEvent::for_request(request, event_type, &context, audit_outcome)
                .with_metadata("path", call.endpoint.path()),
        );
        outcome
    }

    fn refuse(&self, error: DomainError) -> MutationOutcome {
        info!(event_name = "lifecycle.refused_locally", error = %error, "no call made");
        self.ui.notifier.error(&error.to_string());
        MutationOutcome::Invalid(error)
    }

    async fn apply_effects<G>(&self, request: &Request<G>, effects: &[LifecycleEffect]) {
        for effect in effects {
            match effect {
                LifecycleEffect::InvalidateList => {
                    self.cache.invalidate_lists(request.kind).await;
                }
                LifecycleEffect::InvalidateDetail => {
                    if let Some(id) = &request.id {
                        self.cache.invalidate_detail(request.kind, id).await;
                    }
                }
                LifecycleEffect::NavigateBack => self.ui.navigator.back(),
                LifecycleEffect::PostDraft
                | LifecycleEffect::PostForReview
                | LifecycleEffect::PatchApprover
                | LifecycleEffect::PatchStatus => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqflow_core::audit::InMemoryAuditSink;
    use reqflow_core::domain::item_group::{ItemGroup, ItemGroupField};
    use reqflow_core::domain::request::{Request, RequestId, RequestKind};
    use reqflow_core::domain::status::RequestStatus;
    use reqflow_core::domain::user::{Role, UserId};
    use reqflow_core::draft::DraftStore;
    use reqflow_core::errors::DomainError;
    use reqflow_core::lifecycle::LifecycleEngine;
    use reqflow_core::wire::{Endpoint, Payload, StatusUpdate};
    use serde_json::json;
    use tokio::sync::Notify;

    use super::LifecycleService;
    use crate::api::ApiError;
    use crate::cache::{QueryCache, QueryKey};
    use crate::outcome::MutationOutcome;
    use crate::testing::{reply, user, Notice, RecordingUi, ScriptedTransport};
    use crate::ui::UiPorts;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        ui: Arc<RecordingUi>,
        cache: Arc<QueryCache>,
        audit: InMemoryAuditSink,
        service: LifecycleService,
    }

    fn harness(transport: ScriptedTransport, ui: RecordingUi) -> Harness {
        let transport = Arc::new(transport);
        let ui = Arc::new(ui);
        let cache = Arc::new(QueryCache::default());
        let audit = InMemoryAuditSink::default();
        let service = LifecycleService::new(
            transport.clone(),
            cache.clone(),
            UiPorts::shared(ui.clone()),
            LifecycleEngine::default(),
        )
        .with_audit_sink(Arc::new(audit.clone()));
        Harness { transport, ui, cache, audit, service }
    }

    fn purchase_draft() -> DraftStore<ItemGroup> {
        let mut store = DraftStore::new(Request::new(RequestKind::Purchase), Vec::new());
        for (name, value) in [
            ("department", "Logistics"),
            ("suggestedSupplier", "Acme Ltd"),
            ("address", "12 Marina Road"),
            ("dateRequired", "2026-11-02"),
            ("purpose", "Field kits"),
            ("expenseChargedTo", "Malaria Relief - MR-01"),
            ("accountCode", "4100"),
        ] {
            store.set_field(name, value).expect("set field");
        }
        let row = store.add_item_group();
        store.update_item_group(row, ItemGroupField::Quantity, "3").expect("quantity");
        store.update_item_group(row, ItemGroupField::UnitCost, "20").expect("unit cost");
        store
    }

    fn pending_request() -> Request<ItemGroup> {
        let mut request = Request::new(RequestKind::Purchase);
        request.id = Some(RequestId("pr-1".to_owned()));
        request.status = RequestStatus::Pending;
        request.reviewed_by = Some(UserId("rev-1".to_owned()));
        request
    }

    #[tokio::test]
    async fn submit_switches_endpoint_when_reviewer_is_chosen() {
        let h = harness(ScriptedTransport::default(), RecordingUi::confirming());
        let mut store = purchase_draft();

        assert!(h.service.submit(&store, Vec::new()).await.is_completed());
        store.set_reviewer("rev-1");
        assert!(h.service.submit(&store, Vec::new()).await.is_completed());

        let calls = h.transport.calls();
        assert_eq!(calls[0].endpoint, Endpoint::Save(RequestKind::Purchase));
        assert!(matches!(calls[0].payload, Payload::Json(_)));
        assert_eq!(calls[1].endpoint, Endpoint::SaveAndSend(RequestKind::Purchase));
        assert!(matches!(calls[1].payload, Payload::Multipart { .. }));
        assert_eq!(h.ui.back_count(), 2);
    }

    #[tokio::test]
    async fn successful_save_invalidates_lists_and_navigates_back() {
        let h = harness(
            ScriptedTransport::new(vec![reply(json!({"status": 201, "message": "Saved"}))]),
            RecordingUi::confirming(),
        );
        h.cache.insert(QueryKey::list(RequestKind::Purchase), json!([])).await;

        let outcome = h.service.save(&purchase_draft()).await;
        assert!(outcome.is_completed());
        assert!(h.cache.get(&QueryKey::list(RequestKind::Purchase)).await.is_none());
        assert_eq!(h.ui.notices(), vec![Notice::Success("Saved".to_owned())]);
        assert_eq!(h.ui.back_count(), 1);
    }

    #[tokio::test]
    async fn business_rejection_shows_server_message_and_keeps_cache() {
        let h = harness(
            ScriptedTransport::new(vec![reply(json!({"status": 400, "message": "Budget exceeded"}))]),
            RecordingUi::confirming(),
        );
        h.cache.insert(QueryKey::list(RequestKind::Purchase), json!([])).await;

        let outcome = h.service.save(&purchase_draft()).await;
        assert_eq!(outcome, MutationOutcome::Rejected { message: "Budget exceeded".to_owned() });
        assert_eq!(h.ui.notices(), vec![Notice::Error("Budget exceeded".to_owned())]);
        assert!(h.cache.get(&QueryKey::list(RequestKind::Purchase)).await.is_some());
        assert_eq!(h.ui.back_count(), 0);
    }

    #[tokio::test]
    async fn transport_failure_shows_generic_message() {
        let h = harness(
            ScriptedTransport::new(vec![Err(ApiError::Transport("connection reset".to_owned()))]),
            RecordingUi::confirming(),
        );

        let outcome = h.service.save(&purchase_draft()).await;
        assert!(matches!(outcome, MutationOutcome::Failed { .. }));
        assert_eq!(h.ui.notices(), vec![Notice::Error("Network or server error".to_owned())]);
        assert_eq!(h.audit.events()[0].event_type, "lifecycle.draft");
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_network() {
        let h = harness(ScriptedTransport::default(), RecordingUi::confirming());
        let mut store = DraftStore::new(Request::<ItemGroup>::new(RequestKind::Purchase), Vec::new());
        store.set_reviewer("rev-1");

        let outcome = h.service.send_for_review(&store, Vec::new()).await;
        assert!(matches!(outcome, MutationOutcome::Invalid(DomainError::InvalidFields(_))));
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn status_update_requires_confirmation() {
        let declined = harness(ScriptedTransport::default(), RecordingUi::declining());
        let reviewer = user("rev-1", Role::Reviewer);
        let request = pending_request();
        let update = StatusUpdate { status: RequestStatus::Reviewed, comment: None };

        let outcome = declined.service.update_status(&request, &reviewer, update.clone()).await;
        assert_eq!(outcome, MutationOutcome::Cancelled);
        assert!(declined.transport.calls().is_empty());
        assert_eq!(
            declined.ui.prompts(),
            vec!["Are you sure you want to mark this request as reviewed?".to_owned()]
        );
        assert!(declined.ui.alerts().is_empty());

        let refused = harness(
            ScriptedTransport::new(vec![reply(
                json!({"status": 409, "message": "Request already reviewed"}),
            )]),
            RecordingUi::confirming(),
        );
        let outcome = refused.service.update_status(&request, &reviewer, update.clone()).await;
        assert_eq!(
            outcome,
            MutationOutcome::Rejected { message: "Request already reviewed".to_owned() }
        );
        assert_eq!(refused.ui.alerts(), vec!["Request already reviewed".to_owned()]);

        let accepted = harness(ScriptedTransport::default(), RecordingUi::confirming());
        let id = RequestId("pr-1".to_owned());
        accepted.cache.insert(QueryKey::detail(RequestKind::Purchase, &id), json!({})).await;
        let outcome = accepted.service.update_status(&request, &reviewer, update).await;
        assert!(outcome.is_completed());
        assert_eq!(
            accepted.transport.calls()[0].endpoint,
            Endpoint::UpdateStatus(RequestKind::Purchase, id.clone())
        );
        assert!(accepted.cache.get(&QueryKey::detail(RequestKind::Purchase, &id)).await.is_none());
        assert!(accepted.ui.alerts().is_empty());
    }

    #[tokio::test]
    async fn unassigned_actor_is_refused_without_prompt() {
        let h = harness(ScriptedTransport::default(), RecordingUi::confirming());
        let outcome = h
            .service
            .update_status(
                &pending_request(),
                &user("staff-2", Role::Staff),
                StatusUpdate { status: RequestStatus::Reviewed, comment: None },
            )
            .await;

        assert!(matches!(outcome, MutationOutcome::Invalid(DomainError::ActorNotAssigned { .. })));
        assert!(h.ui.prompts().is_empty());
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn cancelled_delete_makes_no_call() {
        let h = harness(ScriptedTransport::default(), RecordingUi::declining());
        let outcome = h.service.delete(&pending_request()).await;
        assert_eq!(outcome, MutationOutcome::Cancelled);
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_raises_an_error_dialog_and_stays() {
        let h = harness(
            ScriptedTransport::new(vec![Err(ApiError::Transport("connection reset".to_owned()))]),
            RecordingUi::confirming(),
        );
        h.cache.insert(QueryKey::list(RequestKind::Purchase), json!([])).await;

        let outcome = h.service.delete(&pending_request()).await;
        assert!(matches!(outcome, MutationOutcome::Failed { .. }));
        assert_eq!(h.ui.alerts(), vec!["Network or server error".to_owned()]);
        assert_eq!(h.ui.notices(), vec![Notice::Error("Network or server error".to_owned())]);
        assert!(h.cache.get(&QueryKey::list(RequestKind::Purchase)).await.is_some());
        assert_eq!(h.ui.back_count(), 0);
    }

    #[tokio::test]
    async fn unconfirmed_mutations_do_not_raise_dialogs() {
        let h = harness(
            ScriptedTransport::new(vec![reply(json!({"status": 400, "message": "Budget exceeded"}))]),
            RecordingUi::confirming(),
        );

        let outcome = h.service.save(&purchase_draft()).await;
        assert!(matches!(outcome, MutationOutcome::Rejected { .. }));
        assert!(h.ui.alerts().is_empty());
    }

    #[tokio::test]
    async fn confirmed_delete_invalidates_lists() {
        let h = harness(ScriptedTransport::default(), RecordingUi::confirming());
        h.cache.insert(QueryKey::list(RequestKind::Purchase), json!([])).await;

        assert!(h.service.delete(&pending_request()).await.is_completed());
        assert_eq!(
            h.transport.calls()[0].endpoint,
            Endpoint::Delete(RequestKind::Purchase, RequestId("pr-1".to_owned()))
        );
        assert!(h.cache.is_empty().await);
        assert_eq!(h.ui.back_count(), 1);
    }

    #[tokio::test]
    async fn copy_to_sends_user_ids() {
        let h = harness(ScriptedTransport::default(), RecordingUi::confirming());
        let outcome = h
            .service
            .copy_to(&pending_request(), &[UserId("u-7".to_owned()), UserId("u-8".to_owned())])
            .await;

        assert!(outcome.is_completed());
        assert_eq!(h.transport.calls()[0].payload, Payload::Json(json!({"userIds": ["u-7", "u-8"]})));
    }

    #[tokio::test]
    async fn second_click_while_in_flight_is_busy() {
        let gate = Arc::new(Notify::new());
        let h = harness(ScriptedTransport::gated(Vec::new(), gate.clone()), RecordingUi::confirming());
        let store = purchase_draft();

        let (first, second, ()) = tokio::join!(
            h.service.save(&store),
            h.service.save(&store),
            async {
                tokio::task::yield_now().await;
                gate.notify_one();
            }
        );

        assert!(first.is_completed());
        assert_eq!(second, MutationOutcome::Busy);
        assert_eq!(h.transport.calls().len(), 1);
    }
}
