use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::BotError;
use crate::webhooks::check_suite::resume_pending_merge;
use crate::webhooks::{HttpResponse, MergeBot, Repository};

#[derive(Debug, Deserialize)]
struct StatusPayload {
    sha: String,
    state: String,
    #[serde(default)]
    context: Option<String>,
    repository: Repository,
}

/// Commit status updates can complete a pending merge just like check suites.
pub async fn handle_status_event(bot: &MergeBot, payload: &Value) -> Result<HttpResponse, BotError> {
    let payload = StatusPayload::deserialize(payload)?;
    debug!(
        "status {} is {} for {}",
        payload.context.as_deref().unwrap_or("unknown"),
        payload.state,
        payload.sha
    );

    let outcome = resume_pending_merge(
        bot,
        &payload.repository.owner.login,
        &payload.repository.name,
        &payload.sha,
    )
    .await?;
    Ok(HttpResponse::action(outcome))
}
