//! The relay proxy: a stateless service in front of the inference provider.
//! `POST /api/chat` forwards the flattened transcript upstream with a fixed
//! model, token budget, and cache policy, then mirrors whichever response
//! shape the provider produced — streaming or whole — back unmodified.

use std::error::Error;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::api::ChatRequest;
use crate::core::config::RelayConfig;

/// Every request runs against the same hosted model.
const UPSTREAM_MODEL: &str = "@cf/meta/llama-3.1-8b-instruct";
const MAX_OUTPUT_TOKENS: u32 = 1024;
/// Upstream responses may be cached for this long.
const CACHE_TTL_SECS: u32 = 3600;
const SYSTEM_PROMPT: &str = "You are a friendly assistant. Keep answers short and helpful.";

/// Environment variable holding the optional upstream bearer credential.
const API_KEY_VAR: &str = "CHINWAG_API_KEY";

#[derive(Clone)]
struct RelayState {
    client: reqwest::Client,
    upstream_url: String,
    api_key: Option<String>,
}

pub async fn run_relay(config: RelayConfig) -> Result<(), Box<dyn Error>> {
    if config.upstream_url.is_empty() {
        return Err("relay.upstream_url is not configured (config.toml or --upstream)".into());
    }

    let state = RelayState {
        client: reqwest::Client::new(),
        upstream_url: config.upstream_url.clone(),
        api_key: std::env::var(API_KEY_VAR).ok(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/api/chat", post(forward_chat))
        .with_state(state)
        .layer(cors);

    if let Some(static_dir) = &config.static_dir {
        if static_dir.exists() {
            info!("serving static assets from {}", static_dir.display());
            app = app.fallback_service(ServeDir::new(static_dir));
        }
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(
        "relay listening on http://{} (upstream: {})",
        config.listen_addr, config.upstream_url
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Body forwarded to the provider: the injected system prompt ahead of the
/// client's flattened input, the fixed model and budgets, and the caller's
/// reasoning options passed through untouched.
fn upstream_body(request: &ChatRequest) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": UPSTREAM_MODEL,
        "input": format!("{SYSTEM_PROMPT}\n\n{}", request.input),
        "max_output_tokens": MAX_OUTPUT_TOKENS,
        "cache": { "ttl": CACHE_TTL_SECS },
    });
    if let Some(reasoning) = &request.reasoning {
        if let Ok(value) = serde_json::to_value(reasoning) {
            body["reasoning"] = value;
        }
    }
    body
}

async fn forward_chat(State(state): State<RelayState>, Json(request): Json<ChatRequest>) -> Response {
    let mut upstream = state
        .client
        .post(&state.upstream_url)
        .json(&upstream_body(&request));
    if let Some(key) = &state.api_key {
        upstream = upstream.bearer_auth(key);
    }

    match upstream.send().await {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status().as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();

            // Mirror the body as-is; streaming responses stay streaming.
            match Response::builder()
                .status(status)
                .header(CONTENT_TYPE, content_type)
                .body(Body::from_stream(response.bytes_stream()))
            {
                Ok(mirrored) => mirrored,
                Err(e) => {
                    error!("failed to build relay response: {e}");
                    StatusCode::BAD_GATEWAY.into_response()
                }
            }
        }
        Err(e) => {
            error!("upstream request failed: {e}");
            (StatusCode::BAD_GATEWAY, "upstream request failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Reasoning, ReasoningEffort, ReasoningSummary};

    #[test]
    fn upstream_body_pins_model_and_budgets() {
        let body = upstream_body(&ChatRequest {
            input: "Hello!\nTell me a joke".into(),
            reasoning: None,
        });
        assert_eq!(body["model"], UPSTREAM_MODEL);
        assert_eq!(body["max_output_tokens"], MAX_OUTPUT_TOKENS);
        assert_eq!(body["cache"]["ttl"], CACHE_TTL_SECS);
        assert!(body.get("reasoning").is_none());
    }

    #[test]
    fn upstream_body_injects_the_system_prompt_first() {
        let body = upstream_body(&ChatRequest {
            input: "Tell me a joke".into(),
            reasoning: None,
        });
        let input = body["input"].as_str().unwrap();
        assert!(input.starts_with(SYSTEM_PROMPT));
        assert!(input.ends_with("Tell me a joke"));
    }

    #[test]
    fn reasoning_options_pass_through() {
        let body = upstream_body(&ChatRequest {
            input: "hi".into(),
            reasoning: Some(Reasoning {
                effort: ReasoningEffort::Low,
                summary: ReasoningSummary::Detailed,
            }),
        });
        assert_eq!(body["reasoning"]["effort"], "low");
        assert_eq!(body["reasoning"]["summary"], "detailed");
    }
}
