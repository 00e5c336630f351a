//! Protocol selection and fallback.
//!
//! Every request tries the Responses endpoint first when the model supports
//! it and passes the reply through untouched. A 400/404/422 rejection from
//! that attempt (or a model that only speaks Chat Completions) routes the
//! request through the translator to the Chat Completions endpoint instead.

use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::logging::{LogLevel, SharedLogger};
use crate::models::{ModelCatalog, ModelInfo, SupportedEndpoints};
use crate::rate_limit::RateLimiter;
use crate::sanitize::drop_orphan_tool_results;
use crate::translate::chat_types::ChatCompletionChunk;
use crate::translate::request::responses_to_chat;
use crate::translate::response::chat_to_responses;
use crate::translate::responses_types::{OutboundEvent, ResponseObject, ResponsesRequest};
use crate::translate::streaming::StreamAccumulator;
use crate::upstream::{FrameStream, SseFrame, UpstreamClient};

/// Outbound SSE frames, shared by the pass-through and translated paths.
pub type EventStream = Pin<Box<dyn Stream<Item = SseFrame> + Send>>;

/// Which upstream protocol served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Responses,
    ChatCompletions,
}

/// Non-streaming reply body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Upstream Responses object, untouched.
    Passthrough(serde_json::Value),
    /// Built from a Chat Completions reply.
    Translated(ResponseObject),
}

pub enum GatewayReply {
    Json { route: Route, body: ResponseBody },
    Stream { route: Route, events: EventStream },
}

impl GatewayReply {
    pub fn route(&self) -> Route {
        match self {
            GatewayReply::Json { route, .. } | GatewayReply::Stream { route, .. } => *route,
        }
    }
}

/// Whether a failed Responses attempt may be retried as Chat Completions.
pub fn is_fallback_eligible(err: &GatewayError, endpoints: SupportedEndpoints) -> bool {
    endpoints.chat_completions && matches!(err.upstream_status(), Some(400 | 404 | 422))
}

/// Parse and validate an inbound request body.
pub fn parse_request(body: &[u8]) -> Result<ResponsesRequest> {
    let req: ResponsesRequest = serde_json::from_slice(body)
        .map_err(|e| GatewayError::invalid_request(format!("Invalid request body: {e}")))?;
    if req.model.trim().is_empty() {
        return Err(GatewayError::invalid_request("`model` must not be empty"));
    }
    Ok(req)
}

pub struct Gateway {
    upstream: Arc<dyn UpstreamClient>,
    models: Arc<dyn ModelCatalog>,
    limiter: Arc<dyn RateLimiter>,
    logger: SharedLogger,
}

impl Gateway {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        models: Arc<dyn ModelCatalog>,
        limiter: Arc<dyn RateLimiter>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            upstream,
            models,
            limiter,
            logger,
        }
    }

    pub fn models(&self) -> &dyn ModelCatalog {
        self.models.as_ref()
    }

    pub fn logger(&self) -> &SharedLogger {
        &self.logger
    }

    /// Serve one request end to end.
    pub async fn handle(&self, req: ResponsesRequest) -> Result<GatewayReply> {
        let info = self.models.lookup(&req.model);
        if !info.endpoints.any() {
            self.logger
                .warn("gateway", format!("Unsupported model: {}", req.model));
            return Err(GatewayError::unsupported_model(req.model));
        }

        self.limiter.check(&req.model).await?;

        let req = self.normalize(req, &info);

        self.logger.info(
            "gateway",
            format!(
                "Request: model={} streaming={} items={}",
                req.model,
                req.is_streaming(),
                req.input.len()
            ),
        );

        if info.endpoints.responses {
            match self.try_responses(&req).await {
                Ok(reply) => return Ok(reply),
                Err(e) if is_fallback_eligible(&e, info.endpoints) => {
                    self.logger.log_with_context(
                        LogLevel::Warn,
                        "gateway",
                        "Responses endpoint rejected request, falling back to chat completions",
                        serde_json::json!({
                            "model": req.model,
                            "status": e.upstream_status(),
                        }),
                    );
                }
                Err(e) => {
                    self.log_failure(Route::Responses, &e);
                    return Err(e);
                }
            }
        }

        self.try_chat_completions(&req).await.map_err(|e| {
            self.log_failure(Route::ChatCompletions, &e);
            e
        })
    }

    /// Drop orphan tool results and fill defaults from model metadata.
    fn normalize(&self, mut req: ResponsesRequest, info: &ModelInfo) -> ResponsesRequest {
        let (input, report) = drop_orphan_tool_results(std::mem::take(&mut req.input));
        req.input = input;
        if !report.is_clean() {
            self.logger.log_with_context(
                LogLevel::Warn,
                "sanitize",
                "Dropped orphan tool results",
                serde_json::json!({
                    "count": report.dropped(),
                    "call_ids": report.dropped_call_ids,
                }),
            );
        }

        if req.max_output_tokens.is_none() {
            req.max_output_tokens = info.max_output_tokens;
        }
        req
    }

    async fn try_responses(&self, req: &ResponsesRequest) -> Result<GatewayReply> {
        if req.is_streaming() {
            let frames = self.upstream.stream_response(req).await?;
            Ok(GatewayReply::Stream {
                route: Route::Responses,
                events: passthrough_stream(frames, self.logger.clone()),
            })
        } else {
            let body = self.upstream.create_response(req).await?;
            Ok(GatewayReply::Json {
                route: Route::Responses,
                body: ResponseBody::Passthrough(body),
            })
        }
    }

    async fn try_chat_completions(&self, req: &ResponsesRequest) -> Result<GatewayReply> {
        if let Some(ref previous) = req.previous_response_id {
            self.logger.debug(
                "gateway",
                format!("previous_response_id={previous} has no chat completions analogue, dropped"),
            );
        }

        let chat_req = responses_to_chat(req);

        if req.is_streaming() {
            let frames = self.upstream.stream_chat_completion(&chat_req).await?;
            Ok(GatewayReply::Stream {
                route: Route::ChatCompletions,
                events: translate_stream(frames, req.model.clone(), self.logger.clone()),
            })
        } else {
            let resp = self.upstream.create_chat_completion(&chat_req).await?;
            let translated = chat_to_responses(&resp, &req.model);
            if let Some(ref usage) = translated.usage {
                self.logger.info(
                    "gateway",
                    format!(
                        "Completed via chat completions: in={} out={} tokens",
                        usage.input_tokens, usage.output_tokens
                    ),
                );
            }
            Ok(GatewayReply::Json {
                route: Route::ChatCompletions,
                body: ResponseBody::Translated(translated),
            })
        }
    }

    fn log_failure(&self, route: Route, err: &GatewayError) {
        let body = match err {
            GatewayError::Upstream { body, .. } => truncate(body, 500),
            _ => "",
        };
        self.logger.log_with_context(
            LogLevel::Error,
            "gateway",
            format!("{route:?} attempt failed: {err}"),
            serde_json::json!({ "status": err.upstream_status(), "body": body }),
        );
    }
}

/// Encode one outbound event as an SSE frame.
pub fn event_frame(event: &OutboundEvent) -> Option<SseFrame> {
    serde_json::to_string(event)
        .ok()
        .map(|json| SseFrame::new(event.event_name(), json))
}

fn stream_error_frame(err: &GatewayError) -> Option<SseFrame> {
    event_frame(&OutboundEvent::Error {
        code: Some("stream_error".to_string()),
        message: err.to_string(),
    })
}

/// Forward upstream Responses frames as they are.
fn passthrough_stream(frames: FrameStream, logger: SharedLogger) -> EventStream {
    Box::pin(async_stream::stream! {
        let mut frames = frames;
        let mut forwarded = 0usize;

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(frame) => {
                    forwarded += 1;
                    yield frame;
                }
                Err(e) => {
                    logger.error("stream", format!("Upstream stream error: {e}"));
                    if let Some(frame) = stream_error_frame(&e) {
                        yield frame;
                    }
                    break;
                }
            }
        }

        logger.info("stream", format!("Responses stream completed: {forwarded} frames"));
    })
}

/// Run Chat Completions chunks through a fresh accumulator, forwarding each
/// chunk's events before reading the next one.
fn translate_stream(frames: FrameStream, model: String, logger: SharedLogger) -> EventStream {
    Box::pin(async_stream::stream! {
        let mut frames = frames;
        let mut acc = StreamAccumulator::new(&model);
        let mut emitted = 0usize;

        while let Some(frame) = frames.next().await {
            let frame = match frame {
                Ok(f) => f,
                Err(e) => {
                    logger.error("stream", format!("Upstream stream error: {e}"));
                    if let Some(frame) = stream_error_frame(&e) {
                        yield frame;
                    }
                    break;
                }
            };

            // [DONE], pings and anything else that isn't a chunk
            let chunk: ChatCompletionChunk = match serde_json::from_str(&frame.data) {
                Ok(c) => c,
                Err(_) => continue,
            };

            for event in acc.process_chunk(&chunk) {
                if let Some(frame) = event_frame(&event) {
                    emitted += 1;
                    yield frame;
                }
            }
        }

        logger.info(
            "stream",
            format!(
                "Chat completions stream completed: id={} events={emitted}",
                acc.response_id().unwrap_or("-")
            ),
        );
    })
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
