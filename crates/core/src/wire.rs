//! Backend REST contract: endpoints, outbound payloads and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::comment::CommentId;
use crate::domain::request::{Request, RequestId, RequestKind};
use crate::domain::status::RequestStatus;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Endpoint {
    Login,
    Me,
    Reviewers,
    Admins,
    Projects,
    List(RequestKind),
    Detail(RequestKind, RequestId),
    Save(RequestKind),
    SaveAndSend(RequestKind),
    Update(RequestKind),
    UpdateStatus(RequestKind, RequestId),
    CopyTo(RequestKind, RequestId),
    Delete(RequestKind, RequestId),
    AddComment(RequestKind, RequestId),
    UpdateComment(RequestKind, RequestId, CommentId),
    DeleteComment(RequestKind, RequestId, CommentId),
    EmploymentLock(UserId),
}

impl Endpoint {
    pub fn method(&self) -> HttpMethod {
        match self {
            Self::Me
            | Self::Reviewers
            | Self::Admins
            | Self::Projects
            | Self::List(_)
            | Self::Detail(..) => HttpMethod::Get,
            Self::Login | Self::Save(_) | Self::SaveAndSend(_) | Self::AddComment(..) => {
                HttpMethod::Post
            }
            Self::Update(_)
            | Self::UpdateStatus(..)
            | Self::CopyTo(..)
            | Self::UpdateComment(..)
            | Self::EmploymentLock(_) => HttpMethod::Patch,
            Self::Delete(..) | Self::DeleteComment(..) => HttpMethod::Delete,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Login => "/users/login".to_string(),
            Self::Me => "/users/me".to_string(),
            Self::Reviewers => "/users/reviewers".to_string(),
            Self::Admins => "/users/admins".to_string(),
            Self::Projects => "/projects".to_string(),
            Self::List(kind) | Self::Update(kind) => format!("/{}", kind.resource()),
            Self::Detail(kind, id) | Self::Delete(kind, id) => {
                format!("/{}/{}", kind.resource(), id)
            }
            Self::Save(kind) => format!("/{}/save", kind.resource()),
            Self::SaveAndSend(kind) => format!("/{}/save-and-send", kind.resource()),
            Self::UpdateStatus(kind, id) => format!("/{}/{}/update-status", kind.resource(), id),
            Self::CopyTo(kind, id) => format!("/{}/{}/copy", kind.resource(), id),
            Self::AddComment(kind, id) => format!("/{}/{}/comments", kind.resource(), id),
            Self::UpdateComment(kind, id, comment) | Self::DeleteComment(kind, id, comment) => {
                format!("/{}/{}/comments/{}", kind.resource(), id, comment.0)
            }
            Self::EmploymentLock(user) => format!("/employment-info/{user}/lock"),
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Login)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Multipart { fields: Vec<(String, String)>, files: Vec<Attachment> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    pub endpoint: Endpoint,
    pub payload: Payload,
}

impl Outbound {
    pub fn bodyless(endpoint: Endpoint) -> Self {
        Self { endpoint, payload: Payload::Empty }
    }

    pub fn json(endpoint: Endpoint, body: Value) -> Self {
        Self { endpoint, payload: Payload::Json(body) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// `{ status?, message?, data? }` as returned by the backend.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ServerVerdict {
    Accepted { message: Option<String>, data: Option<Value> },
    Rejected { message: String },
}

impl ResponseEnvelope {
    /// Bodies without envelope keys are treated as bare data.
    pub fn from_body(body: Value) -> Self {
        let is_envelope = body.as_object().is_some_and(|object| {
            object.contains_key("data") || object.get("status").is_some_and(Value::is_u64)
        });
        if is_envelope {
            if let Ok(envelope) = serde_json::from_value::<ResponseEnvelope>(body.clone()) {
                return envelope;
            }
        }
        Self { status: None, message: None, data: (!body.is_null()).then_some(body) }
    }

    /// A 2xx response is a business success only when its body status is absent, 200 or 201.
    pub fn verdict(self) -> ServerVerdict {
        match self.status {
            None | Some(200) | Some(201) => {
                ServerVerdict::Accepted { message: self.message, data: self.data }
            }
            Some(code) => ServerVerdict::Rejected {
                message: self.message.unwrap_or_else(|| format!("request failed with status {code}")),
            },
        }
    }
}

/// JSON body for draft saves and updates.
pub fn request_json<G: Serialize>(request: &Request<G>) -> Result<Value, DomainError> {
    let mut body = Map::new();
    if let Some(id) = &request.id {
        body.insert("id".to_string(), json!(id.0));
    }
    for (name, value) in request.scalar_fields() {
        body.insert(name.to_string(), Value::String(value));
    }
    if let Some(project) = &request.project {
        body.insert("project".to_string(), json!(project.0));
    }
    if let Some(reviewer) = &request.reviewed_by {
        body.insert("reviewedBy".to_string(), json!(reviewer.0));
    }
    body.insert("itemGroups".to_string(), to_value(&request.item_groups)?);
    body.insert("copiedTo".to_string(), to_value(&request.copied_to)?);
    body.insert("total".to_string(), json!(request.total.to_string()));
    Ok(Value::Object(body))
}

/// Text parts for multipart submissions; nested arrays travel as JSON strings.
pub fn request_form_fields<G: Serialize>(
    request: &Request<G>,
) -> Result<Vec<(String, String)>, DomainError> {
    let mut fields: Vec<(String, String)> = request
        .scalar_fields()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    if let Some(id) = &request.id {
        fields.push(("id".to_string(), id.0.clone()));
    }
    if let Some(project) = &request.project {
        fields.push(("project".to_string(), project.0.clone()));
    }
    if let Some(reviewer) = &request.reviewed_by {
        fields.push(("reviewedBy".to_string(), reviewer.0.clone()));
    }
    fields.push(("itemGroups".to_string(), to_string(&request.item_groups)?));
    fields.push(("copiedTo".to_string(), to_string(&request.copied_to)?));
    fields.push(("total".to_string(), request.total.to_string()));
    Ok(fields)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value).map_err(|error| DomainError::InvariantViolation(error.to_string()))
}

fn to_string<T: Serialize>(value: &T) -> Result<String, DomainError> {
    serde_json::to_string(value).map_err(|error| DomainError::InvariantViolation(error.to_string()))
}
