pub mod auth;
pub mod client;
pub mod pull_request;
pub mod types;

pub use auth::{CredentialToken, GitHubApp, TokenCache};
pub use client::GitHubClient;
pub use pull_request::PullRequestRef;
