#![allow(dead_code)]

use merge_bot::config::AppConfig;
use merge_bot::database::{MemoryStore, PendingMergeStore};
use merge_bot::error::BotError;
use merge_bot::github::GitHubApp;
use merge_bot::validation::{MaintainerEntry, MaintainerSource};
use merge_bot::webhooks::MergeBot;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OWNER: &str = "NixOS";
pub const REPO: &str = "nixpkgs";
pub const APP_ID: u64 = 4242;
pub const HEAD_SHA: &str = "0123456789abcdef0123456789abcdef01234567";
pub const PR_NUMBER: u64 = 42;
pub const PACKAGE_FILE: &str = "pkgs/by-name/he/hello/package.nix";

pub fn private_key() -> String {
    std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/app-key.pem"))
        .expect("fixture private key")
}

pub fn public_key() -> String {
    std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/app-key.pub.pem"
    ))
    .expect("fixture public key")
}

pub fn test_app(server: &MockServer) -> GitHubApp {
    GitHubApp::new(&server.uri(), OWNER, APP_ID, &private_key()).expect("valid app key")
}

/// Maintainers keyed by changed file path.
#[derive(Default)]
pub struct FakeMaintainers {
    by_path: HashMap<String, Vec<MaintainerEntry>>,
}

impl FakeMaintainers {
    pub fn with(mut self, path: &str, name: &str, github_id: u64) -> Self {
        self.by_path
            .entry(path.to_string())
            .or_default()
            .push(MaintainerEntry {
                name: name.to_string(),
                github: Some(name.to_string()),
                github_id: Some(github_id),
            });
        self
    }
}

impl MaintainerSource for FakeMaintainers {
    fn maintainers_for(&self, path: &str) -> Result<Vec<MaintainerEntry>, BotError> {
        Ok(self.by_path.get(path).cloned().unwrap_or_default())
    }
}

pub fn test_config(dry_run: bool) -> AppConfig {
    let mut config =
        AppConfig::from_toml("github_app_login = \"NixOS\"\ngithub_app_id = 4242\n").expect("config");
    config.dry_run = dry_run;
    config
}

pub struct TestBot {
    pub bot: MergeBot,
    pub store: Arc<MemoryStore>,
}

pub fn test_bot(server: &MockServer, dry_run: bool, maintainers: FakeMaintainers) -> TestBot {
    test_bot_with(server, test_config(dry_run), maintainers)
}

pub fn test_bot_with(server: &MockServer, config: AppConfig, maintainers: FakeMaintainers) -> TestBot {
    let store = Arc::new(MemoryStore::new());
    let bot = MergeBot::new(
        &config,
        test_app(server),
        store.clone() as Arc<dyn PendingMergeStore>,
        Arc::new(maintainers),
    )
    .expect("bot");
    TestBot { bot, store }
}

/// Installation lookup and token exchange.
pub async fn mount_installation(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/app/installations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 99, "app_id": APP_ID, "account": { "login": OWNER } }
        ])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "token": "ghs_installation", "expires_at": null })),
        )
        .mount(server)
        .await;
}

pub async fn mount_pull_request(server: &MockServer, state: &str, head_sha: &str, author: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/pulls/{}", OWNER, REPO, PR_NUMBER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": PR_NUMBER,
            "title": "hello: 2.12 -> 2.12.1",
            "state": state,
            "merged": false,
            "head": { "sha": head_sha, "ref": "update-hello" },
            "base": { "sha": "base", "ref": "master" },
            "user": { "login": author, "id": 500, "type": "User" }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/pulls/{}/files", OWNER, REPO, PR_NUMBER)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "filename": PACKAGE_FILE }])),
        )
        .mount(server)
        .await;
}

pub async fn mount_ci(server: &MockServer, status: &str, suites: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits/{}/status", OWNER, REPO, HEAD_SHA)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "state": status, "total_count": 1 })),
        )
        .mount(server)
        .await;
    let count = suites.as_array().map(|s| s.len()).unwrap_or(0);
    Mock::given(method("GET"))
        .and(path(format!(
            "/repos/{}/{}/commits/{}/check-suites",
            OWNER, REPO, HEAD_SHA
        )))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "total_count": count, "check_suites": suites })),
        )
        .mount(server)
        .await;
}

pub async fn mount_comment_sink(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/{}/issues/{}/comments", OWNER, REPO, PR_NUMBER)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1, "body": "" })))
        .mount(server)
        .await;
}

pub async fn mount_reaction_sink(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!(
            "/repos/{}/{}/issues/comments/1001/reactions",
            OWNER, REPO
        )))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "content": "rocket" })))
        .mount(server)
        .await;
}

pub fn suite(app: &str, status: &str, conclusion: Option<&str>) -> Value {
    json!({ "id": 1, "status": status, "conclusion": conclusion, "app": { "name": app } })
}

pub fn repository() -> Value {
    json!({ "name": REPO, "owner": { "login": OWNER } })
}

pub fn issue_comment_payload(body: &str, user_id: u64, login: &str, user_type: &str) -> Value {
    json!({
        "action": "created",
        "comment": {
            "id": 1001,
            "body": body,
            "user": { "id": user_id, "login": login, "type": user_type }
        },
        "issue": {
            "number": PR_NUMBER,
            "title": "hello: 2.12 -> 2.12.1",
            "state": "open",
            "pull_request": { "url": "https://api.github.com/repos/NixOS/nixpkgs/pulls/42" }
        },
        "repository": repository()
    })
}

pub fn merge_comment(user_id: u64, login: &str) -> Value {
    issue_comment_payload("@nixpkgs-merge-bot merge", user_id, login, "User")
}

pub fn check_suite_payload(action: &str, head_sha: &str) -> Value {
    json!({
        "action": action,
        "check_suite": { "id": 5, "head_sha": head_sha, "status": "completed", "conclusion": "success" },
        "repository": repository()
    })
}

pub fn status_payload(sha: &str, state: &str) -> Value {
    json!({
        "sha": sha,
        "state": state,
        "context": "ofborg-eval",
        "repository": repository()
    })
}

/// Bodies of every comment posted to the pull request so far.
pub async fn posted_comments(server: &MockServer) -> Vec<String> {
    let comments_path = format!("/repos/{}/{}/issues/{}/comments", OWNER, REPO, PR_NUMBER);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == comments_path)
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter_map(|v| v["body"].as_str().map(str::to_string))
        .collect()
}

pub async fn merge_requests(server: &MockServer) -> Vec<Value> {
    let merge_path = format!("/repos/{}/{}/pulls/{}/merge", OWNER, REPO, PR_NUMBER);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT" && r.url.path() == merge_path)
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .collect()
}

/// Collaborators with `maintain` permission.
pub async fn mount_committers(server: &MockServer, logins: &[&str]) {
    let body: Vec<Value> = logins
        .iter()
        .enumerate()
        .map(|(i, login)| {
            json!({
                "login": login,
                "id": 900 + i as u64,
                "permissions": { "admin": false, "maintain": true, "push": true }
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/collaborators", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(body)))
        .mount(server)
        .await;
}
