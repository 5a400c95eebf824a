use tracing::{debug, info};

use crate::error::BotError;
use crate::github::PullRequestRef;
use crate::validation::limits::TechnicalLimits;
use crate::validation::{check_maintainership, Actor, MergeVerdict, PolicyContext};

/// Approves pull requests opened by a committer (someone with `maintain`
/// permission on the repository) when the commenter maintains every changed
/// package.
pub struct CommitterPr;

impl CommitterPr {
    pub async fn evaluate(
        pull_request: &PullRequestRef,
        actor: &Actor,
        ctx: &PolicyContext<'_>,
    ) -> Result<MergeVerdict, BotError> {
        let mut verdict = TechnicalLimits::check(pull_request, ctx.settings);
        if !verdict.approved {
            return Ok(verdict);
        }

        let committers = ctx
            .client
            .get_committer_list(&pull_request.owner, &pull_request.repo)
            .await?;
        let allowed: Vec<&str> = committers
            .iter()
            .filter(|c| c.permissions.maintain)
            .map(|c| c.login.as_str())
            .collect();
        debug!("{}: committers: {:?}", pull_request.number, allowed);

        if !allowed.contains(&pull_request.author_login.as_str()) {
            let message = "pr author is not committer";
            info!("{}: {}", pull_request.number, message);
            verdict.decline(message);
        } else {
            check_maintainership(pull_request, actor, ctx.maintainers, &mut verdict)?;
        }

        Ok(verdict)
    }
}
