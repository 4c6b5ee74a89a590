use std::sync::Arc;

use reqflow_core::domain::user::User;
use reqflow_core::permissions::LockToggle;
use reqflow_core::wire::{Endpoint, Outbound};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::api::Transport;
use crate::outcome::{dispatch, Control, MutationOutcome, PendingControls};
use crate::ui::Notifier;

/// Toggles a user's employment-info lock optimistically.
pub struct EmploymentLockService {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    global_lock: bool,
    pending: PendingControls,
}

impl EmploymentLockService {
    pub fn new(transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>, global_lock: bool) -> Self {
        Self { transport, notifier, global_lock, pending: PendingControls::default() }
    }

    /// Flips the lock on `user` right away and restores it if the backend does not accept.
    pub async fn toggle(&self, user: &mut User) -> MutationOutcome {
        let Some(_guard) = self.pending.try_begin(Control::EmploymentLock) else {
            return MutationOutcome::Busy;
        };

        let toggle = LockToggle::apply(user, self.global_lock);
        let call = Outbound::json(
            Endpoint::EmploymentLock(user.id.clone()),
            json!({ "isEmploymentInfoLocked": toggle.requested() }),
        );
        let correlation_id = Uuid::new_v4().to_string();
        let outcome =
            dispatch(self.transport.as_ref(), self.notifier.as_ref(), &call, &correlation_id).await;

        if !outcome.is_completed() {
            warn!(
                event_name = "employment.lock_rolled_back",
                user_id = %user.id,
                correlation_id = %correlation_id,
                "lock toggle not accepted; restoring previous value"
            );
            toggle.rollback(user);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqflow_core::domain::user::Role;
    use reqflow_core::permissions::{can_update_employment_info, employment_info_locked};
    use reqflow_core::wire::Payload;
    use serde_json::json;

    use super::EmploymentLockService;
    use crate::api::ApiError;
    use crate::outcome::MutationOutcome;
    use crate::testing::{reply, user, RecordingUi, ScriptedTransport};

    #[tokio::test]
    async fn accepted_toggle_keeps_the_new_value() {
        let transport = Arc::new(ScriptedTransport::default());
        let service =
            EmploymentLockService::new(transport.clone(), Arc::new(RecordingUi::confirming()), true);
        let mut staff = user("u-1", Role::Staff);
        assert!(employment_info_locked(true, &staff));

        assert!(service.toggle(&mut staff).await.is_completed());
        assert_eq!(staff.employment_info.is_employment_info_locked, Some(false));
        assert!(can_update_employment_info(true, &staff));
        assert_eq!(
            transport.calls()[0].payload,
            Payload::Json(json!({"isEmploymentInfoLocked": false}))
        );
        assert_eq!(transport.calls()[0].endpoint.path(), "/employment-info/u-1/lock");
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back() {
        let transport =
            Arc::new(ScriptedTransport::new(vec![Err(ApiError::Transport("timeout".to_owned()))]));
        let service =
            EmploymentLockService::new(transport, Arc::new(RecordingUi::confirming()), false);
        let mut staff = user("u-1", Role::Staff);

        let outcome = service.toggle(&mut staff).await;
        assert!(matches!(outcome, MutationOutcome::Failed { .. }));
        assert_eq!(staff.employment_info.is_employment_info_locked, None);
    }

    #[tokio::test]
    async fn rejected_toggle_rolls_back_to_explicit_value() {
        let transport = Arc::new(ScriptedTransport::new(vec![reply(
            json!({"status": 403, "message": "Not allowed"}),
        )]));
        let service =
            EmploymentLockService::new(transport, Arc::new(RecordingUi::confirming()), false);
        let mut staff = user("u-1", Role::Staff);
        staff.employment_info.is_employment_info_locked = Some(true);

        let outcome = service.toggle(&mut staff).await;
        assert_eq!(outcome, MutationOutcome::Rejected { message: "Not allowed".to_owned() });
        assert_eq!(staff.employment_info.is_employment_info_locked, Some(true));
    }
}
