pub mod check_suite;
pub mod command;
pub mod comment;
pub mod event;
pub mod github;
pub mod response;
pub mod signature;
pub mod status;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, PolicyConfig};
use crate::database::PendingMergeStore;
use crate::enforcement::MergeDecision;
use crate::error::BotError;
use crate::github::{GitHubApp, GitHubClient};
use crate::validation::{MaintainerSource, PolicyContext, PolicyEvaluator, WorkingCopyMaintainers};
use command::CommandRecognizer;
pub use response::HttpResponse;

/// Everything an event handler needs, shared across requests.
pub struct MergeBot {
    pub app: GitHubApp,
    pub store: Arc<dyn PendingMergeStore>,
    pub maintainers: Arc<dyn MaintainerSource>,
    pub recognizer: CommandRecognizer,
    pub policy: PolicyEvaluator,
    pub policy_settings: PolicyConfig,
    pub dry_run: bool,
    pub webhook_secret: Option<String>,
}

impl MergeBot {
    pub fn new(
        config: &AppConfig,
        app: GitHubApp,
        store: Arc<dyn PendingMergeStore>,
        maintainers: Arc<dyn MaintainerSource>,
    ) -> Result<Self, BotError> {
        let recognizer = CommandRecognizer::new(&config.bot_name)
            .map_err(|e| BotError::ConfigError(format!("Invalid bot name: {}", e)))?;

        Ok(Self {
            app,
            store,
            maintainers,
            recognizer,
            policy: PolicyEvaluator::new(config.strategies()?),
            policy_settings: config.policy.clone(),
            dry_run: config.dry_run,
            webhook_secret: None,
        })
    }

    /// Production wiring: app credentials and webhook secret from disk,
    /// maintainers from the working copy.
    pub fn from_config(config: &AppConfig, store: Arc<dyn PendingMergeStore>) -> Result<Self, BotError> {
        let app = GitHubApp::new(
            &config.github_api_url,
            config.github_app_login.clone(),
            config.github_app_id,
            &config.read_private_key()?,
        )?;
        let maintainers = Arc::new(WorkingCopyMaintainers::new(
            config.repo_path.clone(),
            config.policy.maintainer_file.clone(),
        ));

        let mut bot = Self::new(config, app, store, maintainers)?;
        bot.webhook_secret = config.read_webhook_secret()?;
        Ok(bot)
    }

    pub(crate) fn policy_context<'a>(&'a self, client: &'a GitHubClient) -> PolicyContext<'a> {
        PolicyContext {
            client,
            maintainers: self.maintainers.as_ref(),
            settings: &self.policy_settings,
        }
    }

    pub(crate) fn decision<'a>(&'a self, client: &'a GitHubClient) -> MergeDecision<'a> {
        MergeDecision {
            client,
            store: self.store.as_ref(),
            dry_run: self.dry_run,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Repository {
    pub name: String,
    pub owner: Owner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Owner {
    pub login: String,
}

pub fn router(bot: Arc<MergeBot>) -> Router {
    Router::new()
        .route("/", post(github::handle_webhook))
        .route("/webhook", post(github::handle_webhook))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(bot)
}

async fn health_check(State(bot): State<Arc<MergeBot>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "merge-bot",
        "dry_run": bot.dry_run,
    }))
}
