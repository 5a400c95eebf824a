use serde_json::Value;
use tracing::{debug, info, warn};

use crate::enforcement::{CiReconciler, MergeOutcome};
use crate::error::BotError;
use crate::github::PullRequestRef;
use crate::validation::Actor;
use crate::webhooks::command::CommandOutcome;
use crate::webhooks::event::{EventKind, IssueEvent};
use crate::webhooks::{HttpResponse, MergeBot};

/// Entry point for issue comments, review comments and reviews.
pub async fn handle_comment_event(
    bot: &MergeBot,
    kind: EventKind,
    payload: &Value,
) -> Result<HttpResponse, BotError> {
    let event = IssueEvent::from_payload(kind, payload)?;
    debug!("{}", event);

    match bot.recognizer.recognize(&event) {
        CommandOutcome::Merge => {
            let outcome = merge_command(bot, &event).await?;
            Ok(HttpResponse::action(outcome.as_str()))
        }
        ignored => {
            debug!("{}: ignoring event: {}", event.issue_number, ignored.as_str());
            Ok(HttpResponse::action(ignored.as_str()))
        }
    }
}

async fn merge_command(bot: &MergeBot, event: &IssueEvent) -> Result<MergeOutcome, BotError> {
    info!("{}: We have been called with the merge command", event.issue_number);
    let client = bot.app.client().await?;
    let pull_request =
        PullRequestRef::fetch(&client, &event.repo_owner, &event.repo_name, event.issue_number)
            .await?;

    let actor = Actor {
        id: event.actor_id,
        login: event.actor_login.clone(),
    };

    info!("{}: Checking mergeability", event.issue_number);
    let verdict = bot
        .policy
        .evaluate(&pull_request, &actor, &bot.policy_context(&client))
        .await?;

    let decision = bot.decision(&client);
    if !verdict.approved {
        info!("{}: No merge strategy passed, we let the user know", event.issue_number);
        return decision
            .decline(&pull_request, Some(&event.actor_login), &verdict.decline_reasons)
            .await;
    }

    info!("{}: A merge strategy passed, reacting with a rocket", event.issue_number);
    if let Some(target) = event.target {
        if let Err(e) = client
            .create_issue_reaction(&event.repo_owner, &event.repo_name, target, "rocket")
            .await
        {
            warn!("{}: failed to add reaction: {}", event.issue_number, e);
        }
    }

    let ci = CiReconciler::reconcile(&client, &pull_request).await?;
    decision
        .conclude(
            &pull_request,
            Some(&event.actor_login),
            ci,
            verdict.decline_reasons,
            true,
        )
        .await
}
