//! Resuming parked merges when CI reports back.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::enforcement::CiReconciler;
use crate::error::BotError;
use crate::github::PullRequestRef;
use crate::webhooks::{HttpResponse, MergeBot, Repository};

#[derive(Debug, Deserialize)]
struct CheckSuitePayload {
    action: String,
    check_suite: CheckSuiteRef,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct CheckSuiteRef {
    head_sha: String,
}

pub async fn handle_check_suite_event(
    bot: &MergeBot,
    payload: &Value,
) -> Result<HttpResponse, BotError> {
    let payload = CheckSuitePayload::deserialize(payload)?;
    if payload.action != "completed" {
        debug!(
            "ignoring check suite {} for {}",
            payload.action, payload.check_suite.head_sha
        );
        return Ok(HttpResponse::action("ignore-action"));
    }

    let outcome = resume_pending_merge(
        bot,
        &payload.repository.owner.login,
        &payload.repository.name,
        &payload.check_suite.head_sha,
    )
    .await?;
    Ok(HttpResponse::action(outcome))
}

/// Re-runs CI reconciliation for a sha we were waiting on.
///
/// The pull request is re-fetched; if it closed or its head moved, the
/// record is dropped instead of merging a commit nobody asked for.
pub(crate) async fn resume_pending_merge(
    bot: &MergeBot,
    owner: &str,
    repo: &str,
    head_sha: &str,
) -> Result<&'static str, BotError> {
    let Some(pending) = bot.store.get(head_sha).await? else {
        debug!("no pending merge for {}", head_sha);
        return Ok("no-pending-merge");
    };

    info!(
        "{}: CI update for pending merge at {}",
        pending.issue_number, head_sha
    );
    let client = bot.app.client().await?;
    let pull_request = PullRequestRef::fetch(&client, owner, repo, pending.issue_number).await?;

    if !pull_request.is_open() || pull_request.head_sha != head_sha {
        info!(
            "{}: pull request is {} at {}, dropping pending merge for {}",
            pending.issue_number, pull_request.state, pull_request.head_sha, head_sha
        );
        bot.store.delete(head_sha).await?;
        return Ok("ignore-stale");
    }

    let ci = CiReconciler::reconcile(&client, &pull_request).await?;
    let outcome = bot
        .decision(&client)
        .conclude(&pull_request, None, ci, Vec::new(), false)
        .await?;
    Ok(outcome.as_str())
}
