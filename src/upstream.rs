//! Calls to the upstream provider's two endpoints.
//!
//! The gateway core only sees the [`UpstreamClient`] trait; [`HttpUpstream`]
//! is the reqwest-backed implementation used by the binary.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::translate::chat_types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::translate::responses_types::ResponsesRequest;

/// One server-sent event: optional event name plus its data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }
}

/// Frames read from an upstream streaming reply, in arrival order.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame>> + Send>>;

/// The two upstream endpoints, streaming and not.
///
/// Every method fails with [`GatewayError::Upstream`] when upstream answers
/// with an error status, carrying that status and the raw body.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn create_response(&self, req: &ResponsesRequest) -> Result<serde_json::Value>;

    async fn stream_response(&self, req: &ResponsesRequest) -> Result<FrameStream>;

    async fn create_chat_completion(
        &self,
        req: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse>;

    async fn stream_chat_completion(&self, req: &ChatCompletionRequest) -> Result<FrameStream>;
}

pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()?;

        let api_key = match config.resolve_api_key() {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("{e}; sending upstream requests without credentials");
                None
            }
        };

        Ok(Self::new(client, config.upstream.base_url.clone(), api_key))
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(%url, "POST upstream");

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::upstream(status, body));
        }
        Ok(response)
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn create_response(&self, req: &ResponsesRequest) -> Result<serde_json::Value> {
        let response = self.post("responses", req).await?;
        Ok(response.json().await?)
    }

    async fn stream_response(&self, req: &ResponsesRequest) -> Result<FrameStream> {
        let response = self.post("responses", req).await?;
        Ok(frames(response))
    }

    async fn create_chat_completion(
        &self,
        req: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        let response = self.post("chat/completions", req).await?;
        Ok(response.json().await?)
    }

    async fn stream_chat_completion(&self, req: &ChatCompletionRequest) -> Result<FrameStream> {
        let response = self.post("chat/completions", req).await?;
        Ok(frames(response))
    }
}

/// Decode an SSE response body into frames. The default `message` event name
/// is reported as `None`.
fn frames(response: reqwest::Response) -> FrameStream {
    let stream = response.bytes_stream().eventsource().map(|result| match result {
        Ok(event) => Ok(SseFrame {
            event: Some(event.event).filter(|name| !name.is_empty() && name != "message"),
            data: event.data,
        }),
        Err(e) => Err(GatewayError::stream(e.to_string())),
    });
    Box::pin(stream)
}
