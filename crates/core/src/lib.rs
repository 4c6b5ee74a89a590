pub mod audit;
pub mod calculator;
pub mod comments;
pub mod config;
pub mod domain;
pub mod draft;
pub mod errors;
pub mod lifecycle;
pub mod permissions;
pub mod review;
pub mod wire;

pub use audit::{AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use calculator::{aggregate, compute_total, compute_travel_total};
pub use comments::CommentThread;
pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::comment::{Comment, CommentId};
pub use domain::item_group::{ItemGroup, ItemGroupField, LineItem, TravelItemField, TravelItemGroup};
pub use domain::project::{AccountCode, Project, ProjectId};
pub use domain::request::{Request, RequestId, RequestKind};
pub use domain::status::RequestStatus;
pub use domain::user::{Capability, PermissionModule, Role, User, UserId, UserSummary};
pub use draft::{DraftStore, EditableRow, ValidationIssue};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use lifecycle::{LifecycleAction, LifecycleEngine, LifecyclePolicy, TransitionContext};
pub use permissions::{can_update_employment_info, employment_info_locked, LockToggle};
pub use review::{resolve_review_panel, submit_action, ReviewPanel, SubmitAction};
pub use wire::{Endpoint, Outbound, Payload, ResponseEnvelope, ServerVerdict, StatusUpdate};
