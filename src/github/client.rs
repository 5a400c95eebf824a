use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ApiError;
use crate::github::types::*;

pub const USER_AGENT: &str = "nixpkgs-merge-bot";
pub const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

/// Typed wrapper around the GitHub REST API.
///
/// Every request carries the same header set (JSON content type, pinned API
/// version, bearer token, fixed user agent). Failures come back as
/// [`ApiError`] and never as raw transport errors.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Same endpoint and connection pool, different bearer token.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(header::USER_AGENT, USER_AGENT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(|e| ApiError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ApiError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                url,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            url,
            message: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Follow `page=N` until a page comes back short.
    async fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch: Vec<T> = self
                .get(&format!("{}{}per_page={}&page={}", path, separator, PER_PAGE, page))
                .await?;
            let full = batch.len() == PER_PAGE;
            items.extend(batch);
            if !full {
                return Ok(items);
            }
            page += 1;
        }
    }

    pub async fn app_installations(&self) -> Result<Vec<Installation>, ApiError> {
        self.get_all_pages("/app/installations").await
    }

    pub async fn create_installation_access_token(
        &self,
        installation_id: u64,
    ) -> Result<AccessToken, ApiError> {
        self.post(
            &format!("/app/installations/{}/access_tokens", installation_id),
            &json!({}),
        )
        .await
    }

    pub async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<PullRequest, ApiError> {
        self.get(&format!("/repos/{}/{}/pulls/{}", owner, repo, pr_number))
            .await
    }

    pub async fn pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<ChangedFile>, ApiError> {
        self.get_all_pages(&format!("/repos/{}/{}/pulls/{}/files", owner, repo, pr_number))
            .await
    }

    pub async fn get_statuses_for_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CombinedStatus, ApiError> {
        self.get(&format!("/repos/{}/{}/commits/{}/status", owner, repo, sha))
            .await
    }

    pub async fn get_check_suites_for_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<CheckSuite>, ApiError> {
        let mut suites = Vec::new();
        let mut page = 1;
        loop {
            let batch: CheckSuiteList = self
                .get(&format!(
                    "/repos/{}/{}/commits/{}/check-suites?per_page={}&page={}",
                    owner, repo, sha, PER_PAGE, page
                ))
                .await?;
            let full = batch.check_suites.len() == PER_PAGE;
            suites.extend(batch.check_suites);
            if !full || suites.len() as u64 >= batch.total_count {
                return Ok(suites);
            }
            page += 1;
        }
    }

    pub async fn get_committer_list(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Collaborator>, ApiError> {
        self.get_all_pages(&format!(
            "/repos/{}/{}/collaborators?permission=maintain",
            owner, repo
        ))
        .await
    }

    pub async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<IssueComment, ApiError> {
        self.post(
            &format!("/repos/{}/{}/issues/{}/comments", owner, repo, issue_number),
            &json!({ "body": body }),
        )
        .await
    }

    pub async fn create_issue_reaction(
        &self,
        owner: &str,
        repo: &str,
        target: CommentTarget,
        reaction: &str,
    ) -> Result<(), ApiError> {
        let path = match target {
            CommentTarget::Issue(id) => {
                format!("/repos/{}/{}/issues/comments/{}/reactions", owner, repo, id)
            }
            CommentTarget::ReviewComment(id) => {
                format!("/repos/{}/{}/pulls/comments/{}/reactions", owner, repo, id)
            }
        };
        let _: Value = self.post(&path, &json!({ "content": reaction })).await?;
        Ok(())
    }

    /// Merge only if the head is still `sha`; GitHub answers 409 otherwise.
    pub async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        sha: &str,
    ) -> Result<MergeResult, ApiError> {
        self.put(
            &format!("/repos/{}/{}/pulls/{}/merge", owner, repo, pr_number),
            &json!({ "sha": sha }),
        )
        .await
    }
}
