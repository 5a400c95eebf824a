use crate::error::ApiError;
use crate::github::client::GitHubClient;

/// Pull request state as seen at decision time.
///
/// Always fetched fresh: a force-push between deliveries moves `head_sha`,
/// and only the sha fetched here may be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author_login: String,
    pub head_sha: String,
    pub base_ref: String,
    pub changed_files: Vec<String>,
}

impl PullRequestRef {
    pub async fn fetch(
        client: &GitHubClient,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Self, ApiError> {
        let pull_request = client.pull_request(owner, repo, number).await?;
        let files = client.pull_request_files(owner, repo, number).await?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
            title: pull_request.title,
            state: pull_request.state,
            author_login: pull_request.user.login,
            head_sha: pull_request.head.sha,
            base_ref: pull_request.base.ref_field,
            changed_files: files.into_iter().map(|file| file.filename).collect(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}
