//! GitHub App credentials and API gateway behaviour against a mock GitHub.

mod common;

use base64::Engine;
use chrono::Duration;
use common::*;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use merge_bot::error::{ApiError, CredentialError};
use merge_bot::github::auth::Claims;
use merge_bot::github::GitHubClient;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_token_is_minted_once_within_freshness_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/installations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 99, "app_id": APP_ID, "account": { "login": OWNER } }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "token": "ghs_cached" })))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server);
    let first = app.get_token().await.unwrap();
    let second = app.get_token().await.unwrap();
    assert_eq!(first.value, "ghs_cached");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_stale_token_is_minted_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/installations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 99, "app_id": APP_ID, "account": { "login": OWNER } }
        ])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/app/installations/99/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "token": "ghs_new" })))
        .expect(2)
        .mount(&server)
        .await;

    let app = test_app(&server).with_freshness(Duration::seconds(0));
    app.get_token().await.unwrap();
    app.get_token().await.unwrap();
}

#[tokio::test]
async fn test_installation_lookup_is_case_sensitive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/installations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "app_id": APP_ID, "account": { "login": "nixos" } },
            { "id": 2, "app_id": 7, "account": { "login": OWNER } }
        ])))
        .mount(&server)
        .await;

    let result = test_app(&server).get_token().await;
    assert!(matches!(
        result,
        Err(CredentialError::InstallationNotFound { app_id: APP_ID, .. })
    ));
}

#[tokio::test]
async fn test_app_jwt_is_signed_with_the_app_key() {
    let server = MockServer::start().await;
    mount_installation(&server).await;

    test_app(&server).get_token().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let jwt = auth.strip_prefix("Bearer ").unwrap();

    for part in jwt.split('.') {
        assert!(!part.contains('='));
        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(part)
            .unwrap();
    }

    let key = DecodingKey::from_rsa_pem(public_key().as_bytes()).unwrap();
    let token = decode::<Claims>(jwt, &key, &Validation::new(Algorithm::RS256)).unwrap();
    assert_eq!(token.claims.iss, APP_ID.to_string());
    assert_eq!(token.claims.exp - token.claims.iat, 600);

    // the token exchange is authenticated with the same app JWT
    let exchange = requests
        .iter()
        .find(|r| r.url.path() == "/app/installations/99/access_tokens")
        .unwrap();
    assert_eq!(exchange.headers.get("authorization").unwrap(), auth.as_str());
}

#[tokio::test]
async fn test_client_sends_uniform_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/NixOS/nixpkgs/commits/abc/status"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("x-github-api-version", "2022-11-28"))
        .and(header("user-agent", "nixpkgs-merge-bot"))
        .and(header("authorization", "Bearer ghs_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "state": "success", "total_count": 2 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::new(server.uri(), Some("ghs_token".to_string()));
    let status = client
        .get_statuses_for_commit("NixOS", "nixpkgs", "abc")
        .await
        .unwrap();
    assert_eq!(status.state, "success");
}

#[tokio::test]
async fn test_error_status_keeps_body_and_reason() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/repos/NixOS/nixpkgs/pulls/42/merge"))
        .and(body_json(json!({ "sha": "abc" })))
        .respond_with(
            ResponseTemplate::new(409).set_body_string("{\"message\":\"Head branch was modified\"}"),
        )
        .mount(&server)
        .await;

    let client = GitHubClient::new(server.uri(), Some("t".to_string()));
    let err = client
        .merge_pull_request("NixOS", "nixpkgs", 42, "abc")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert!(err.summary().starts_with("409 Conflict: "));
    assert!(err.summary().contains("Head branch was modified"));
}

#[tokio::test]
async fn test_undecodable_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/NixOS/nixpkgs/pulls/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = GitHubClient::new(server.uri(), None);
    let err = client.pull_request("NixOS", "nixpkgs", 1).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn test_changed_files_are_paginated() {
    let server = MockServer::start().await;
    let first: Vec<_> = (0..100)
        .map(|i| json!({ "filename": format!("pkgs/by-name/p{}/package.nix", i) }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/repos/NixOS/nixpkgs/pulls/7/files"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(first)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/NixOS/nixpkgs/pulls/7/files"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "filename": "pkgs/by-name/last" }])),
        )
        .mount(&server)
        .await;

    let client = GitHubClient::new(server.uri(), None);
    let files = client.pull_request_files("NixOS", "nixpkgs", 7).await.unwrap();
    assert_eq!(files.len(), 101);
    assert_eq!(files[100].filename, "pkgs/by-name/last");
}

#[tokio::test]
async fn test_concurrent_callers_share_one_current_token() {
    let server = MockServer::start().await;
    mount_installation(&server).await;
    let app = test_app(&server);

    let (a, b, c) = tokio::join!(app.get_token(), app.get_token(), app.get_token());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert_eq!(a.value, "ghs_installation");
    assert_eq!(a.value, b.value);
    assert_eq!(b.value, c.value);

    // redundant mints are tolerated, but never more than one per caller
    let before = token_mints(&server).await;
    assert!((1..=3).contains(&before));

    // once any mint landed, the cache answers without a round trip
    let cached = app.get_token().await.unwrap();
    assert_eq!(cached.value, "ghs_installation");
    assert_eq!(token_mints(&server).await, before);
}

async fn token_mints(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/app/installations/99/access_tokens")
        .count()
}
