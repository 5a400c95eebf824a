//! Merge policy.
//!
//! A fixed set of strategies each decide independently whether the commenter
//! may merge a pull request. The overall verdict approves when any strategy
//! approves, and always carries every strategy's decline reasons.

pub mod committer;
pub mod limits;
pub mod maintainer_update;
pub mod maintainers;

use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::config::PolicyConfig;
use crate::error::BotError;
use crate::github::{GitHubClient, PullRequestRef};
pub use maintainers::{MaintainerEntry, MaintainerSource, WorkingCopyMaintainers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeVerdict {
    pub approved: bool,
    pub decline_reasons: Vec<String>,
}

impl MergeVerdict {
    pub fn approve() -> Self {
        Self {
            approved: true,
            decline_reasons: Vec::new(),
        }
    }

    pub fn decline(&mut self, reason: impl Into<String>) {
        self.approved = false;
        self.decline_reasons.push(reason.into());
    }

    /// OR over approvals, concatenation over reasons, in input order.
    pub fn any(verdicts: impl IntoIterator<Item = MergeVerdict>) -> Self {
        verdicts.into_iter().fold(
            Self {
                approved: false,
                decline_reasons: Vec::new(),
            },
            |mut acc, verdict| {
                acc.approved |= verdict.approved;
                acc.decline_reasons.extend(verdict.decline_reasons);
                acc
            },
        )
    }
}

/// The user who asked for the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub login: String,
}

/// What a strategy may consult while deciding.
pub struct PolicyContext<'a> {
    pub client: &'a GitHubClient,
    pub maintainers: &'a dyn MaintainerSource,
    pub settings: &'a PolicyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// The commenter maintains every package the pull request touches.
    MaintainerUpdate,
    /// The author is a committer and the commenter maintains every package.
    Committer,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::MaintainerUpdate => "maintainer-update",
            StrategyKind::Committer => "committer",
        }
    }

    pub async fn evaluate(
        &self,
        pull_request: &PullRequestRef,
        actor: &Actor,
        ctx: &PolicyContext<'_>,
    ) -> Result<MergeVerdict, BotError> {
        match self {
            StrategyKind::MaintainerUpdate => {
                maintainer_update::MaintainerUpdate::evaluate(pull_request, actor, ctx)
            }
            StrategyKind::Committer => {
                committer::CommitterPr::evaluate(pull_request, actor, ctx).await
            }
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maintainer-update" => Ok(StrategyKind::MaintainerUpdate),
            "committer" => Ok(StrategyKind::Committer),
            other => Err(format!("unknown merge strategy: {}", other)),
        }
    }
}

pub struct PolicyEvaluator {
    strategies: Vec<StrategyKind>,
}

impl PolicyEvaluator {
    pub fn new(strategies: Vec<StrategyKind>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[StrategyKind] {
        &self.strategies
    }

    pub async fn evaluate(
        &self,
        pull_request: &PullRequestRef,
        actor: &Actor,
        ctx: &PolicyContext<'_>,
    ) -> Result<MergeVerdict, BotError> {
        let mut verdicts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            info!("{}: Running {} merge strategy", pull_request.number, strategy);
            let verdict = strategy.evaluate(pull_request, actor, ctx).await?;
            info!(
                "{}: {} strategy approved: {}",
                pull_request.number, strategy, verdict.approved
            );
            verdicts.push(verdict);
        }

        let verdict = MergeVerdict::any(verdicts);
        for reason in &verdict.decline_reasons {
            info!("{}: {}", pull_request.number, reason);
        }
        Ok(verdict)
    }
}

/// Declines once per changed file whose package `actor` does not maintain.
pub(crate) fn check_maintainership(
    pull_request: &PullRequestRef,
    actor: &Actor,
    maintainers: &dyn MaintainerSource,
    verdict: &mut MergeVerdict,
) -> Result<(), BotError> {
    for path in &pull_request.changed_files {
        let declared = maintainers.maintainers_for(path)?;
        if maintainers::is_maintainer(actor.id, &actor.login, &declared) {
            continue;
        }

        let valid = if declared.is_empty() {
            "none are declared".to_string()
        } else {
            declared
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        verdict.decline(format!(
            "{}: github id {} is not a package maintainer, valid maintainers are: {}",
            path, actor.id, valid
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declined(reason: &str) -> MergeVerdict {
        let mut verdict = MergeVerdict::approve();
        verdict.decline(reason);
        verdict
    }

    #[test]
    fn test_any_approval_wins_but_reasons_survive() {
        let verdict = MergeVerdict::any(vec![declined("not a maintainer"), MergeVerdict::approve()]);
        assert!(verdict.approved);
        assert_eq!(verdict.decline_reasons, vec!["not a maintainer".to_string()]);
    }

    #[test]
    fn test_all_declines_concatenate_in_order() {
        let verdict = MergeVerdict::any(vec![declined("first"), declined("second")]);
        assert!(!verdict.approved);
        assert_eq!(verdict.decline_reasons, vec!["first", "second"]);
    }

    #[test]
    fn test_no_strategies_never_approves() {
        assert!(!MergeVerdict::any(Vec::new()).approved);
    }

    #[test]
    fn test_strategy_names_round_trip() {
        for kind in [StrategyKind::MaintainerUpdate, StrategyKind::Committer] {
            assert_eq!(kind.name().parse::<StrategyKind>(), Ok(kind));
        }
        assert!("Committer".parse::<StrategyKind>().is_err());
    }
}
