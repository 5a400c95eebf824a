use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::webhooks::event::EventKind;
use crate::webhooks::signature::verify_signature;
use crate::webhooks::{check_suite, comment, status, HttpResponse, MergeBot};

pub async fn handle_webhook(
    State(bot): State<Arc<MergeBot>>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    let event_name = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());

    process_delivery(&bot, event_name, signature, &body).await
}

/// Verifies, parses and dispatches one delivery.
pub async fn process_delivery(
    bot: &MergeBot,
    event_name: &str,
    signature: Option<&str>,
    body: &[u8],
) -> HttpResponse {
    if let Some(secret) = &bot.webhook_secret {
        let valid = signature.is_some_and(|header| verify_signature(body, secret.as_bytes(), header));
        if !valid {
            warn!("Rejecting {} delivery with invalid signature", event_name);
            return HttpResponse::error(401, "invalid-signature");
        }
    }

    let payload: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Rejecting {} delivery with malformed body: {}", event_name, e);
            return HttpResponse::error(400, "invalid-json");
        }
    };

    info!("Received webhook: {}", event_name);

    let result = match event_name {
        "ping" => return HttpResponse::action("pong"),
        "check_suite" => check_suite::handle_check_suite_event(bot, &payload).await,
        "status" => status::handle_status_event(bot, &payload).await,
        other => match EventKind::from_header(other) {
            Some(kind) => comment::handle_comment_event(bot, kind, &payload).await,
            None => {
                info!("Unhandled webhook event: {}", other);
                return HttpResponse::action("ignore-event");
            }
        },
    };

    match result {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to handle {} event: {}", event_name, e);
            HttpResponse::error(500, &e.to_string())
        }
    }
}
