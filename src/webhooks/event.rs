//! Comment-bearing webhook payloads mapped onto one [`IssueEvent`] shape.

use serde::Deserialize;
use serde_json::Value;

use crate::error::BotError;
use crate::github::types::{CommentTarget, User};
use crate::webhooks::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    IssueComment,
    ReviewComment,
    Review,
}

impl EventKind {
    pub fn from_header(name: &str) -> Option<Self> {
        match name {
            "issue_comment" => Some(EventKind::IssueComment),
            "pull_request_review_comment" => Some(EventKind::ReviewComment),
            "pull_request_review" => Some(EventKind::Review),
            _ => None,
        }
    }
}

/// Snapshot of one delivery; discarded after processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueEvent {
    pub actor_id: u64,
    pub actor_login: String,
    pub is_bot: bool,
    pub comment_text: String,
    pub action: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub issue_number: u64,
    pub is_pull_request: bool,
    pub title: String,
    pub state: String,
    /// Where a reaction to the triggering text goes; reviews have none.
    pub target: Option<CommentTarget>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
    user: User,
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    title: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct IssueCommentPayload {
    action: String,
    comment: Comment,
    issue: Issue,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct ReviewCommentPayload {
    action: String,
    comment: Comment,
    pull_request: PullRequest,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    action: String,
    review: Comment,
    pull_request: PullRequest,
    repository: Repository,
}

impl IssueEvent {
    pub fn from_payload(kind: EventKind, payload: &Value) -> Result<Self, BotError> {
        match kind {
            EventKind::IssueComment => {
                let p = IssueCommentPayload::deserialize(payload)?;
                Ok(Self {
                    actor_id: p.comment.user.id,
                    is_bot: p.comment.user.is_bot(),
                    actor_login: p.comment.user.login,
                    comment_text: p.comment.body.unwrap_or_default(),
                    action: p.action,
                    repo_owner: p.repository.owner.login,
                    repo_name: p.repository.name,
                    issue_number: p.issue.number,
                    is_pull_request: p.issue.pull_request.is_some_and(|pr| !pr.is_null()),
                    title: p.issue.title,
                    state: p.issue.state,
                    target: Some(CommentTarget::Issue(p.comment.id)),
                })
            }
            EventKind::ReviewComment => {
                let p = ReviewCommentPayload::deserialize(payload)?;
                Ok(Self {
                    actor_id: p.comment.user.id,
                    is_bot: p.comment.user.is_bot(),
                    actor_login: p.comment.user.login,
                    comment_text: p.comment.body.unwrap_or_default(),
                    action: p.action,
                    repo_owner: p.repository.owner.login,
                    repo_name: p.repository.name,
                    issue_number: p.pull_request.number,
                    is_pull_request: true,
                    title: p.pull_request.title,
                    state: p.pull_request.state,
                    target: Some(CommentTarget::ReviewComment(p.comment.id)),
                })
            }
            EventKind::Review => {
                let p = ReviewPayload::deserialize(payload)?;
                Ok(Self {
                    actor_id: p.review.user.id,
                    is_bot: p.review.user.is_bot(),
                    actor_login: p.review.user.login,
                    comment_text: p.review.body.unwrap_or_default(),
                    action: p.action,
                    repo_owner: p.repository.owner.login,
                    repo_name: p.repository.name,
                    issue_number: p.pull_request.number,
                    is_pull_request: true,
                    title: p.pull_request.title,
                    state: p.pull_request.state,
                    target: None,
                })
            }
        }
    }
}

impl std::fmt::Display for IssueEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: Pull Request: {} by {}",
            self.issue_number, self.title, self.actor_login
        )
    }
}
