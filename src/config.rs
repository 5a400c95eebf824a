use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::BotError;
use crate::validation::StrategyKind;

const DEFAULT_CONFIG_FILE: &str = "merge-bot.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_api_url")]
    pub github_api_url: String,
    #[serde(default)]
    pub github_app_login: String,
    #[serde(default)]
    pub github_app_id: u64,
    #[serde(default)]
    pub github_app_private_key: PathBuf,
    #[serde(default)]
    pub webhook_secret_file: Option<PathBuf>,
    #[serde(default = "default_repo_path")]
    pub repo_path: PathBuf,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Never merge; report successful decisions as declined instead.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub strategies: Vec<String>,
    pub allowed_base_branches: Vec<String>,
    pub package_paths: Vec<String>,
    pub max_changed_files: usize,
    pub maintainer_file: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            strategies: vec!["maintainer-update".to_string(), "committer".to_string()],
            allowed_base_branches: vec![
                "master".to_string(),
                "staging".to_string(),
                "staging-next".to_string(),
            ],
            package_paths: vec!["pkgs/by-name/**".to_string()],
            max_changed_files: 32,
            maintainer_file: "maintainers.yml".to_string(),
        }
    }
}

fn default_bot_name() -> String {
    "nixpkgs-merge-bot".to_string()
}

fn default_host() -> String {
    "::".to_string()
}

fn default_port() -> u16 {
    3014
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_repo_path() -> PathBuf {
    PathBuf::from("nixpkgs")
}

fn default_database_url() -> String {
    "sqlite://merge-bot.db".to_string()
}

fn default_dry_run() -> bool {
    true
}

impl AppConfig {
    /// Load from the file named by `MERGE_BOT_CONFIG` (optional) and
    /// `MERGE_BOT_*` environment variables.
    pub fn load() -> Result<Self, BotError> {
        let path = env::var("MERGE_BOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, BotError> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("MERGE_BOT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| BotError::ConfigError(format!("Failed to load configuration: {}", e)))?;

        Self::finish(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self, BotError> {
        let settings = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .map_err(|e| BotError::ConfigError(format!("Failed to parse configuration: {}", e)))?;

        Self::finish(settings)
    }

    fn finish(settings: Config) -> Result<Self, BotError> {
        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| BotError::ConfigError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BotError> {
        if self.bot_name.trim().is_empty() {
            return Err(BotError::ConfigError("bot_name must not be empty".to_string()));
        }

        if self.policy.strategies.is_empty() {
            return Err(BotError::ConfigError(
                "policy.strategies must name at least one merge strategy".to_string(),
            ));
        }
        self.strategies()?;

        for pattern in &self.policy.package_paths {
            glob::Pattern::new(pattern).map_err(|e| {
                BotError::ConfigError(format!("Invalid package path pattern {:?}: {}", pattern, e))
            })?;
        }

        Ok(())
    }

    /// Configured strategies in evaluation order.
    pub fn strategies(&self) -> Result<Vec<StrategyKind>, BotError> {
        self.policy
            .strategies
            .iter()
            .map(|name| {
                name.parse::<StrategyKind>()
                    .map_err(|_| BotError::ConfigError(format!("Unknown merge strategy: {}", name)))
            })
            .collect()
    }

    pub fn read_private_key(&self) -> Result<String, BotError> {
        std::fs::read_to_string(&self.github_app_private_key).map_err(|e| {
            BotError::ConfigError(format!(
                "Failed to read private key {:?}: {}",
                self.github_app_private_key, e
            ))
        })
    }

    pub fn read_webhook_secret(&self) -> Result<Option<String>, BotError> {
        match &self.webhook_secret_file {
            Some(path) => std::fs::read_to_string(path)
                .map(|secret| Some(secret.trim().to_string()))
                .map_err(|e| {
                    BotError::ConfigError(format!("Failed to read webhook secret {:?}: {}", path, e))
                }),
            None => Ok(None),
        }
    }
}
