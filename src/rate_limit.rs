//! Pre-flight rate limiting.

use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::{GatewayError, Result};

/// Checked once per request before any upstream call.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, model: &str) -> Result<()>;
}

/// Limiter that admits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn check(&self, _model: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last: Instant,
}

/// Token-bucket limiter shared by all requests. Rejects instead of waiting.
pub struct TokenBucket {
    rps: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(rps: f64, burst: f64) -> Self {
        Self {
            rps,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last: Instant::now(),
            }),
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        let rps = cfg.requests_per_second.max(0.0);
        // default burst: 1 second worth. Below 1 no request could ever pass.
        let burst = cfg.burst.unwrap_or(rps).max(1.0);
        Self::new(rps, burst)
    }

    /// Take one token without waiting.
    pub async fn try_acquire(&self) -> bool {
        if self.rps <= 0.0 {
            return true;
        }

        let mut st = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(st.last).as_secs_f64();
        if elapsed > 0.0 {
            st.tokens = (st.tokens + elapsed * self.rps).min(self.burst);
            st.last = now;
        }

        if st.tokens >= 1.0 {
            st.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn check(&self, model: &str) -> Result<()> {
        if self.try_acquire().await {
            Ok(())
        } else {
            Err(GatewayError::rate_limited(format!(
                "Too many requests (model={model}); limit is {} per second",
                self.rps
            )))
        }
    }
}
