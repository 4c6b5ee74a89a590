use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserSummary;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: CommentId,
    pub text: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited: bool,
    /// Legacy soft-delete marker; newer comments never carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl Comment {
    pub fn is_visible(&self) -> bool {
        self.deleted != Some(true)
    }
}
