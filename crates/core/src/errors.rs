use thiserror::Error;

use crate::domain::status::RequestStatus;
use crate::lifecycle::LifecycleAction;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid transition from {from:?} using {action:?}")]
    InvalidTransition { from: Option<RequestStatus>, action: LifecycleAction },
    #[error("user `{actor}` is not assigned to act on a {status} request")]
    ActorNotAssigned { actor: String, status: RequestStatus },
    #[error("a reviewer must be selected before sending for review")]
    ReviewerRequired,
    #[error("an approver must be selected before sending for approval")]
    ApproverRequired,
    #[error("missing or invalid fields: {0:?}")]
    InvalidFields(Vec<String>),
    #[error("unknown field `{field}`")]
    UnknownField { field: String },
    #[error("`{value}` is not a valid number for `{field}`")]
    InvalidNumber { field: String, value: String },
    #[error("item group row {index} does not exist ({len} rows)")]
    RowOutOfRange { index: usize, len: usize },
    #[error("item group row {index} is locked; toggle edit mode first")]
    RowLocked { index: usize },
    #[error("only the author may change comment `{comment}`")]
    NotCommentAuthor { comment: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("session failure: {0}")]
    Session(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthenticated: {message}")]
    Unauthenticated { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unauthenticated { .. } => "Your session has expired. Please log in again.",
            Self::ServiceUnavailable { .. } => "Network or server error",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthenticated { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Session(message) => {
                Self::Unauthenticated { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
