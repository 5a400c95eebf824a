//! Package maintainer lookup.
//!
//! Maintainers are declared per package in a YAML file living in the package
//! directory of the repository working copy. The working copy itself is kept
//! up to date by something else; this module only reads it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::BotError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintainerEntry {
    pub name: String,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub github_id: Option<u64>,
}

impl MaintainerEntry {
    /// The numeric id wins when declared; logins are compared case-insensitively.
    pub fn matches(&self, actor_id: u64, actor_login: &str) -> bool {
        match (self.github_id, &self.github) {
            (Some(id), _) => id == actor_id,
            (None, Some(login)) => login.eq_ignore_ascii_case(actor_login),
            (None, None) => false,
        }
    }
}

pub fn is_maintainer(actor_id: u64, actor_login: &str, maintainers: &[MaintainerEntry]) -> bool {
    maintainers.iter().any(|m| m.matches(actor_id, actor_login))
}

pub trait MaintainerSource: Send + Sync {
    /// Maintainers of the package owning `path`. Empty when none are declared.
    fn maintainers_for(&self, path: &str) -> Result<Vec<MaintainerEntry>, BotError>;
}

/// Reads the nearest `maintainer_file` above a changed path in the working copy.
pub struct WorkingCopyMaintainers {
    repo_path: PathBuf,
    maintainer_file: String,
}

impl WorkingCopyMaintainers {
    pub fn new(repo_path: impl Into<PathBuf>, maintainer_file: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            maintainer_file: maintainer_file.into(),
        }
    }

    fn find_metadata(&self, path: &Path) -> Option<PathBuf> {
        path.ancestors()
            .skip(1)
            .take_while(|dir| !dir.as_os_str().is_empty())
            .map(|dir| self.repo_path.join(dir).join(&self.maintainer_file))
            .find(|candidate| candidate.is_file())
    }
}

impl MaintainerSource for WorkingCopyMaintainers {
    fn maintainers_for(&self, path: &str) -> Result<Vec<MaintainerEntry>, BotError> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(BotError::MaintainerError(format!(
                "Refusing to resolve maintainers for path {:?}",
                path
            )));
        }

        let Some(metadata) = self.find_metadata(relative) else {
            debug!("No maintainer metadata found for {}", path);
            return Ok(Vec::new());
        };

        let contents = fs::read_to_string(&metadata).map_err(|e| {
            BotError::MaintainerError(format!("Failed to read {:?}: {}", metadata, e))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            BotError::MaintainerError(format!("Failed to parse {:?}: {}", metadata, e))
        })
    }
}
