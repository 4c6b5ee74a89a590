use chrono::Utc;
use serde_json::json;

use crate::domain::comment::{Comment, CommentId};
use crate::domain::request::Request;
use crate::domain::user::{User, UserSummary};
use crate::errors::DomainError;
use crate::lifecycle::submission::saved_id;
use crate::wire::{Endpoint, Outbound};

/// Review comments attached to one request, oldest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommentThread {
    comments: Vec<Comment>,
}

impl CommentThread {
    pub fn new(comments: Vec<Comment>) -> Self {
        Self { comments }
    }

    pub fn visible(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|comment| comment.is_visible())
    }

    pub fn get(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| &comment.id == id)
    }

    /// Edit and delete controls are only offered to the author.
    pub fn can_modify(comment: &Comment, current_user: &User) -> bool {
        comment.user.id == current_user.id
    }

    pub fn append(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    /// Applies an edit locally; returns false when the comment is unknown or not the user's.
    pub fn apply_edit(&mut self, id: &CommentId, text: &str, current_user: &User) -> bool {
        match self.comments.iter_mut().find(|comment| &comment.id == id) {
            Some(comment) if Self::can_modify(comment, current_user) => {
                comment.text = text.to_string();
                comment.edited = true;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: &CommentId, current_user: &User) -> bool {
        let before = self.comments.len();
        self.comments.retain(|comment| {
            &comment.id != id || !Self::can_modify(comment, current_user)
        });
        self.comments.len() != before
    }

    pub fn into_inner(self) -> Vec<Comment> {
        self.comments
    }
}

/// A locally-built comment used until the server returns the stored one.
pub fn draft_comment(id: CommentId, text: &str, author: &User) -> Comment {
    Comment {
        id,
        text: text.to_string(),
        user: UserSummary::from(author),
        created_at: Utc::now(),
        edited: false,
        deleted: None,
    }
}

pub fn add_comment_call<G>(request: &Request<G>, text: &str) -> Result<Outbound, DomainError> {
    let id = saved_id(request)?;
    let text = non_blank(text)?;
    Ok(Outbound::json(Endpoint::AddComment(request.kind, id.clone()), json!({ "text": text })))
}

pub fn update_comment_call<G>(
    request: &Request<G>,
    comment: &Comment,
    current_user: &User,
    text: &str,
) -> Result<Outbound, DomainError> {
    let id = saved_id(request)?;
    ensure_author(comment, current_user)?;
    let text = non_blank(text)?;
    Ok(Outbound::json(
        Endpoint::UpdateComment(request.kind, id.clone(), comment.id.clone()),
        json!({ "text": text }),
    ))
}

pub fn delete_comment_call<G>(
    request: &Request<G>,
    comment: &Comment,
    current_user: &User,
) -> Result<Outbound, DomainError> {
    let id = saved_id(request)?;
    ensure_author(comment, current_user)?;
    Ok(Outbound::bodyless(Endpoint::DeleteComment(request.kind, id.clone(), comment.id.clone())))
}

fn ensure_author(comment: &Comment, current_user: &User) -> Result<(), DomainError> {
    if CommentThread::can_modify(comment, current_user) {
        Ok(())
    } else {
        Err(DomainError::NotCommentAuthor { comment: comment.id.0.clone() })
    }
}

fn non_blank(text: &str) -> Result<&str, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidFields(vec!["text".to_string()]));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{add_comment_call, delete_comment_call, draft_comment, update_comment_call, CommentThread};
    use crate::domain::comment::CommentId;
    use crate::domain::item_group::ItemGroup;
    use crate::domain::request::{Request, RequestId, RequestKind};
    use crate::domain::user::fixtures::user;
    use crate::domain::user::Role;
    use crate::errors::DomainError;
    use crate::wire::{Endpoint, Payload};

    fn saved_request() -> Request<ItemGroup> {
        let mut request = Request::new(RequestKind::Concept);
        request.id = Some(RequestId("cn-7".to_string()));
        request
    }

    #[test]
    fn only_authors_may_modify_their_comments() {
        let author = user("u-1", Role::Staff);
        let other = user("u-2", Role::Admin);
        let comment = draft_comment(CommentId("c-1".to_string()), "Please attach quotes", &author);

        assert!(CommentThread::can_modify(&comment, &author));
        assert!(!CommentThread::can_modify(&comment, &other));
    }

    #[test]
    fn edits_mark_the_comment_edited() {
        let author = user("u-1", Role::Staff);
        let mut thread = CommentThread::default();
        thread.append(draft_comment(CommentId("c-1".to_string()), "first", &author));

        assert!(thread.apply_edit(&CommentId("c-1".to_string()), "second", &author));
        let comment = thread.get(&CommentId("c-1".to_string())).expect("comment");
        assert_eq!(comment.text, "second");
        assert!(comment.edited);
    }

    #[test]
    fn non_authors_cannot_edit_or_remove() {
        let author = user("u-1", Role::Staff);
        let intruder = user("u-9", Role::Staff);
        let mut thread = CommentThread::default();
        thread.append(draft_comment(CommentId("c-1".to_string()), "mine", &author));

        assert!(!thread.apply_edit(&CommentId("c-1".to_string()), "hijacked", &intruder));
        assert!(!thread.remove(&CommentId("c-1".to_string()), &intruder));
        assert!(thread.remove(&CommentId("c-1".to_string()), &author));
        assert_eq!(thread.visible().count(), 0);
    }

    #[test]
    fn legacy_deleted_comments_are_hidden() {
        let author = user("u-1", Role::Staff);
        let mut legacy = draft_comment(CommentId("c-old".to_string()), "old", &author);
        legacy.deleted = Some(true);
        let mut kept = draft_comment(CommentId("c-kept".to_string()), "kept", &author);
        kept.deleted = Some(false);
        let fresh = draft_comment(CommentId("c-new".to_string()), "new", &author);

        let thread = CommentThread::new(vec![legacy, kept, fresh]);
        let ids: Vec<&str> = thread.visible().map(|comment| comment.id.0.as_str()).collect();
        assert_eq!(ids, vec!["c-kept", "c-new"]);
    }

    #[test]
    fn comment_calls_target_the_parent_request() {
        let author = user("u-1", Role::Staff);
        let request = saved_request();
        let comment = draft_comment(CommentId("c-1".to_string()), "first", &author);

        let add = add_comment_call(&request, "  Needs a budget line  ").expect("add call");
        assert_eq!(add.endpoint, Endpoint::AddComment(RequestKind::Concept, RequestId("cn-7".to_string())));
        assert_eq!(add.payload, Payload::Json(json!({"text": "Needs a budget line"})));

        let update = update_comment_call(&request, &comment, &author, "second").expect("update call");
        assert_eq!(update.endpoint.path(), "/concept-notes/cn-7/comments/c-1");

        let delete = delete_comment_call(&request, &comment, &author).expect("delete call");
        assert_eq!(delete.payload, Payload::Empty);
    }

    #[test]
    fn comment_calls_enforce_author_and_text() {
        let author = user("u-1", Role::Staff);
        let other = user("u-2", Role::Reviewer);
        let request = saved_request();
        let comment = draft_comment(CommentId("c-1".to_string()), "first", &author);

        assert_eq!(
            delete_comment_call(&request, &comment, &other),
            Err(DomainError::NotCommentAuthor { comment: "c-1".to_string() })
        );
        assert_eq!(
            add_comment_call(&request, "   "),
            Err(DomainError::InvalidFields(vec!["text".to_string()]))
        );
        assert!(add_comment_call(&Request::<ItemGroup>::new(RequestKind::Concept), "hi").is_err());
    }
}
