//! CI reconciliation.
//!
//! Two kinds of CI signal are attached to a commit: legacy commit statuses
//! and check suites. Statuses are consulted first and a pending status
//! short-circuits, because some status reporters create their check suite
//! only after their status goes green. When statuses succeed, every check
//! suite must be completed with a conclusion of `success` or `skipped`.
//!
//! ```text
//! Unknown -> StatusesPending | StatusesFailed | StatusesSuccess
//! StatusesSuccess -> CheckSuitesPending | CheckSuitesFailed | CheckSuitesSuccess
//! ```

use tracing::{debug, info};

use crate::error::ApiError;
use crate::github::types::{CheckSuite, CombinedStatus};
use crate::github::{GitHubClient, PullRequestRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiStage {
    Unknown,
    StatusesPending,
    StatusesFailed,
    StatusesSuccess,
    CheckSuitesPending,
    CheckSuitesFailed,
    CheckSuitesSuccess,
}

/// Aggregate CI verdict for one head commit. Never persisted; recomputed
/// from live API state whenever needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiOutcome {
    Pending(Vec<String>),
    Success(Vec<String>),
    Failed(Vec<String>),
}

impl CiOutcome {
    fn from_stage(stage: CiStage, messages: Vec<String>) -> Self {
        match stage {
            CiStage::Unknown | CiStage::StatusesPending | CiStage::CheckSuitesPending => {
                CiOutcome::Pending(messages)
            }
            CiStage::StatusesFailed | CiStage::CheckSuitesFailed => CiOutcome::Failed(messages),
            CiStage::StatusesSuccess | CiStage::CheckSuitesSuccess => CiOutcome::Success(messages),
        }
    }

    pub fn messages(&self) -> &[String] {
        match self {
            CiOutcome::Pending(m) | CiOutcome::Success(m) | CiOutcome::Failed(m) => m,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CiOutcome::Pending(_) => "pending",
            CiOutcome::Success(_) => "success",
            CiOutcome::Failed(_) => "failed",
        }
    }
}

pub struct CiReconciler;

impl CiReconciler {
    pub fn statuses_stage(status: &CombinedStatus) -> (CiStage, Vec<String>) {
        match status.state.as_str() {
            "success" => (CiStage::StatusesSuccess, Vec::new()),
            "pending" => (
                CiStage::StatusesPending,
                vec!["Some status is still pending".to_string()],
            ),
            other => (
                CiStage::StatusesFailed,
                vec![format!("Combined commit status is {}", other)],
            ),
        }
    }

    /// Any incomplete suite makes the result pending, even when another suite
    /// already failed: a later webhook will rerun the reconciliation.
    pub fn check_suites_stage(suites: &[CheckSuite]) -> (CiStage, Vec<String>) {
        let mut pending = false;
        let mut failed = false;
        let mut messages = Vec::new();

        for suite in suites {
            debug!(
                "{} conclusion: {:?} and status: {:?}",
                suite.app_name(),
                suite.conclusion,
                suite.status
            );
            if suite.status.as_deref() != Some("completed") {
                pending = true;
                messages.push(format!(
                    "Check suite {} is not completed, we will wait for it to finish and if it succeeds we will merge this.",
                    suite.app_name()
                ));
                continue;
            }

            match suite.conclusion.as_deref() {
                Some("success") | Some("skipped") => {}
                conclusion => {
                    failed = true;
                    messages.push(format!(
                        "Check suite {} is {}",
                        suite.app_name(),
                        conclusion.unwrap_or("without conclusion")
                    ));
                }
            }
        }

        let stage = if pending {
            CiStage::CheckSuitesPending
        } else if failed {
            CiStage::CheckSuitesFailed
        } else {
            CiStage::CheckSuitesSuccess
        };
        (stage, messages)
    }

    pub async fn reconcile(
        client: &GitHubClient,
        pull_request: &PullRequestRef,
    ) -> Result<CiOutcome, ApiError> {
        let status = client
            .get_statuses_for_commit(&pull_request.owner, &pull_request.repo, &pull_request.head_sha)
            .await?;
        let (stage, messages) = Self::statuses_stage(&status);
        if stage != CiStage::StatusesSuccess {
            info!(
                "{}: Status {} is not success ({:?})",
                pull_request.number, status.state, stage
            );
            return Ok(CiOutcome::from_stage(stage, messages));
        }

        debug!(
            "{}: All statuses succeeded, checking check suites",
            pull_request.number
        );
        let suites = client
            .get_check_suites_for_commit(
                &pull_request.owner,
                &pull_request.repo,
                &pull_request.head_sha,
            )
            .await?;
        let (stage, messages) = Self::check_suites_stage(&suites);
        info!("{}: CI reconciled to {:?}", pull_request.number, stage);
        Ok(CiOutcome::from_stage(stage, messages))
    }
}
