pub mod api;
pub mod auth;
pub mod cache;
pub mod comments;
pub mod employment;
pub mod http;
pub mod lifecycle;
pub mod outcome;
pub mod queries;
pub mod retry;
pub mod session;
pub mod testing;
pub mod ui;

pub use api::{ApiError, NoToken, StaticToken, TokenSource, Transport};
pub use auth::{AuthError, AuthService};
pub use cache::{QueryCache, QueryKey};
pub use comments::CommentService;
pub use employment::EmploymentLockService;
pub use http::HttpTransport;
pub use lifecycle::LifecycleService;
pub use outcome::{Control, MutationOutcome};
pub use queries::Queries;
pub use retry::RetryPolicy;
pub use session::{SessionError, SessionStore};
pub use ui::{Confirmer, Navigator, Notifier, UiPorts};
