use thiserror::Error;

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        Self::WebhookError(format!("JSON deserialization error: {}", err))
    }
}

impl From<sqlx::Error> for BotError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(format!("Database error: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Maintainer lookup error: {0}")]
    MaintainerError(String),

    #[error("Webhook processing error: {0}")]
    WebhookError(String),
}

/// Failure of a single outbound REST call.
///
/// Every call made through [`crate::github::client::GitHubClient`] fails with
/// one of these; transport errors from the HTTP stack never escape raw.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The remote answered with a non-success status code.
    #[error("GitHub API error: {status} {reason} for {url}: {body}")]
    Status {
        status: u16,
        reason: String,
        url: String,
        body: String,
    },

    /// The request never produced a response.
    #[error("GitHub API request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response body was not the JSON shape we asked for.
    #[error("GitHub API response from {url} could not be decoded: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// One-line description used in user-facing failure comments.
    pub fn summary(&self) -> String {
        match self {
            Self::Status {
                status,
                reason,
                body,
                ..
            } => format!("{} {}: {}", status, reason, body),
            Self::Transport { message, .. } | Self::Decode { message, .. } => message.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Invalid GitHub App private key: {0}")]
    InvalidKey(String),

    #[error("Failed to sign GitHub App assertion: {0}")]
    Signing(String),

    #[error("Installation not found for {login} and app id {app_id} (matching is case sensitive)")]
    InstallationNotFound { login: String, app_id: u64 },

    #[error(transparent)]
    Api(#[from] ApiError),
}
