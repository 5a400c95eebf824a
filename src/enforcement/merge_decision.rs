//! Acting on a reconciled CI outcome.
//!
//! Shared by the comment flow (a maintainer just asked for the merge) and the
//! resume flows (CI reported back for a commit we were waiting on).

use tracing::{error, info};

use crate::database::{PendingMerge, PendingMergeStore};
use crate::enforcement::ci_status::CiOutcome;
use crate::enforcement::comments::{self, CommentGenerator};
use crate::error::BotError;
use crate::github::{GitHubClient, PullRequestRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Postponed,
    Merged,
    MergeFailed,
    NotPermitted,
}

impl MergeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeOutcome::Postponed => "merge-postponed",
            MergeOutcome::Merged => "merged",
            MergeOutcome::MergeFailed => "merge-failed",
            MergeOutcome::NotPermitted => "not-permitted",
        }
    }
}

pub struct MergeDecision<'a> {
    pub client: &'a GitHubClient,
    pub store: &'a dyn PendingMergeStore,
    pub dry_run: bool,
}

impl MergeDecision<'_> {
    /// `announce_pending` is false when resuming, so that every intermediate
    /// CI webhook does not produce another comment.
    pub async fn conclude(
        &self,
        pull_request: &PullRequestRef,
        requester: Option<&str>,
        ci: CiOutcome,
        mut reasons: Vec<String>,
        announce_pending: bool,
    ) -> Result<MergeOutcome, BotError> {
        let number = pull_request.number;
        match ci {
            CiOutcome::Pending(messages) => {
                for message in &messages {
                    info!("{}: {}", number, message);
                }
                self.store
                    .put(&PendingMerge::new(&pull_request.head_sha, number))
                    .await?;
                info!("{}: {}", number, comments::POSTPONED);
                if announce_pending {
                    self.comment(pull_request, comments::POSTPONED).await?;
                }
                Ok(MergeOutcome::Postponed)
            }
            CiOutcome::Failed(messages) => {
                info!("{}: CI failed, we let the user know", number);
                reasons.extend(messages);
                self.store.delete(&pull_request.head_sha).await?;
                self.decline(pull_request, requester, &reasons).await
            }
            CiOutcome::Success(messages) => {
                reasons.extend(messages);
                if self.dry_run {
                    info!("{}: dry running, aborting here", number);
                    reasons.push(comments::DRY_RUN_REASON.to_string());
                    self.store.delete(&pull_request.head_sha).await?;
                    return self.decline(pull_request, requester, &reasons).await;
                }
                self.merge(pull_request, requester).await
            }
        }
    }

    /// Posts every reason in one comment.
    ///
    /// Leaves pending records alone: a refused commenter must not cancel a
    /// merge someone else already queued for this sha.
    pub async fn decline(
        &self,
        pull_request: &PullRequestRef,
        requester: Option<&str>,
        reasons: &[String],
    ) -> Result<MergeOutcome, BotError> {
        let msg = CommentGenerator::not_permitted(requester, reasons);
        info!("{}: {}", pull_request.number, msg);
        self.comment(pull_request, &msg).await?;
        Ok(MergeOutcome::NotPermitted)
    }

    async fn merge(
        &self,
        pull_request: &PullRequestRef,
        requester: Option<&str>,
    ) -> Result<MergeOutcome, BotError> {
        self.store.delete(&pull_request.head_sha).await?;

        info!(
            "{}: Trying to merge pull request at {}",
            pull_request.number, pull_request.head_sha
        );
        match self
            .client
            .merge_pull_request(
                &pull_request.owner,
                &pull_request.repo,
                pull_request.number,
                &pull_request.head_sha,
            )
            .await
        {
            Ok(_) => {
                info!("{}: Merge completed", pull_request.number);
                self.comment(pull_request, comments::MERGE_COMPLETED).await?;
                Ok(MergeOutcome::Merged)
            }
            Err(e) => {
                error!("{}: merge failed: {}", pull_request.number, e);
                let msg = CommentGenerator::merge_failed(requester, &e.summary());
                self.comment(pull_request, &msg).await?;
                Ok(MergeOutcome::MergeFailed)
            }
        }
    }

    async fn comment(&self, pull_request: &PullRequestRef, body: &str) -> Result<(), BotError> {
        self.client
            .create_issue_comment(
                &pull_request.owner,
                &pull_request.repo,
                pull_request.number,
                body,
            )
            .await?;
        Ok(())
    }
}
