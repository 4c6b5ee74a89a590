pub mod engine;
pub mod states;
pub mod submission;

pub use engine::{
    current_status, LifecycleDefinition, LifecycleEngine, LifecyclePolicy, ReviewerOnlyLifecycle,
    ReviewerThenApproverLifecycle,
};
pub use states::{
    ApprovalStages, LifecycleAction, LifecycleEffect, TransitionContext, TransitionOutcome,
};
pub use submission::{
    copy_to_call, delete_call, plan_approver_assignment, plan_save, plan_send, plan_status_update,
    plan_submission, Submission,
};
