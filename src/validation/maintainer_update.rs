use tracing::debug;

use crate::error::BotError;
use crate::github::PullRequestRef;
use crate::validation::limits::TechnicalLimits;
use crate::validation::{check_maintainership, Actor, MergeVerdict, PolicyContext};

/// Approves when the commenter maintains the package behind every changed file.
pub struct MaintainerUpdate;

impl MaintainerUpdate {
    pub fn evaluate(
        pull_request: &PullRequestRef,
        actor: &Actor,
        ctx: &PolicyContext<'_>,
    ) -> Result<MergeVerdict, BotError> {
        let mut verdict = TechnicalLimits::check(pull_request, ctx.settings);
        if !verdict.approved {
            return Ok(verdict);
        }

        debug!(
            "{}: checking that {} maintains all {} changed files",
            pull_request.number,
            actor.login,
            pull_request.changed_files.len()
        );
        check_maintainership(pull_request, actor, ctx.maintainers, &mut verdict)?;
        Ok(verdict)
    }
}
