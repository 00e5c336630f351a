use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{self, EventStream, Gateway, GatewayReply};
use crate::translate::responses_types::ErrorResponse;
use crate::upstream::SseFrame;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub config: GatewayConfig,
    pub gateway: Gateway,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/responses", post(handle_responses))
        .route("/health", get(handle_health))
        .route("/v1/models", get(handle_models))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_responses(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req = match gateway::parse_request(&body) {
        Ok(r) => r,
        Err(e) => {
            state
                .gateway
                .logger()
                .error("server", format!("Failed to parse request: {}", e));
            return error_response(&e);
        }
    };

    match state.gateway.handle(req).await {
        Ok(GatewayReply::Json { body, .. }) => Json(body).into_response(),
        Ok(GatewayReply::Stream { events, .. }) => sse_response(events),
        Err(e) => error_response(&e),
    }
}

fn sse_response(events: EventStream) -> Response {
    let stream = events.map(|frame| -> std::result::Result<Event, Infallible> { Ok(to_event(frame)) });

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn to_event(frame: SseFrame) -> Event {
    let event = Event::default().data(frame.data);
    match frame.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Map a failure onto the reply the client sees. Upstream statuses are kept,
/// and upstream JSON error bodies are forwarded untouched.
pub fn error_response(err: &GatewayError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);

    let body = match err {
        GatewayError::Upstream { body, .. } => {
            if serde_json::from_str::<serde_json::Value>(body).is_ok() {
                return Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.clone()))
                    .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
            }
            ErrorResponse::api_error(format!("Upstream returned status {}: {}", status.as_u16(), body))
        }
        GatewayError::InvalidRequest { message } => ErrorResponse::invalid_request(message.clone()),
        GatewayError::UnsupportedModel { .. } => ErrorResponse::unsupported_model(err.to_string()),
        GatewayError::RateLimited { message } => ErrorResponse::rate_limited(message.clone()),
        _ => ErrorResponse::api_error(format!("Gateway error: {}", err)),
    };

    (status, Json(body)).into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let models: Vec<serde_json::Value> = state
        .gateway
        .models()
        .known_models()
        .into_iter()
        .map(|(id, info)| {
            let mut endpoints = Vec::new();
            if info.endpoints.responses {
                endpoints.push("responses");
            }
            if info.endpoints.chat_completions {
                endpoints.push("chat_completions");
            }
            serde_json::json!({
                "id": id,
                "object": "model",
                "owned_by": state.config.upstream.base_url,
                "endpoints": endpoints,
                "max_output_tokens": info.max_output_tokens,
            })
        })
        .collect();

    Json(serde_json::json!({ "data": models, "object": "list" }))
}
