use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use ticketwatch_core::SolverConfig;

/// Reply while the worker has not finished the challenge.
const NOT_READY: &str = "CAPCHA_NOT_READY";

/// Errors from a challenge-solving service.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Transport failure or non-success HTTP status
    #[error("solver request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service replied with something that is not its JSON envelope
    #[error("unexpected solver response: {0}")]
    InvalidResponse(String),
}

/// Obtains a token for an interactive challenge.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Solve the challenge with `site_key` shown on `page_url`.
    ///
    /// Returns `Ok(None)` when the service could not produce a token.
    async fn solve(&self, site_key: &str, page_url: &str) -> Result<Option<String>, SolverError>;
}

/// `{"status": 1, "request": "..."}` envelope used by `in.php` and `res.php`.
#[derive(Debug, Deserialize)]
struct ApiReply {
    status: i64,
    request: String,
}

/// Client for the 2Captcha-style `in.php` / `res.php` API.
#[derive(Debug, Clone)]
pub struct TwoCaptchaSolver {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl TwoCaptchaSolver {
    /// Create a solver, or `None` when no API key is configured.
    #[must_use]
    pub fn from_config(config: &SolverConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref()?.trim();
        if api_key.is_empty() {
            return None;
        }
        Some(Self::new(
            api_key.to_string(),
            config.api_base.clone(),
            Duration::from_secs(config.poll_interval_secs),
            config.max_polls,
        ))
    }

    /// Create a solver against `api_base`.
    #[must_use]
    pub fn new(api_key: String, api_base: String, poll_interval: Duration, max_polls: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            poll_interval,
            max_polls,
        }
    }

    async fn submit(&self, site_key: &str, page_url: &str) -> Result<ApiReply, SolverError> {
        let reply = self
            .client
            .post(format!("{}/in.php", self.api_base))
            .form(&[
                ("key", self.api_key.as_str()),
                ("method", "userrecaptcha"),
                ("googlekey", site_key),
                ("pageurl", page_url),
                ("json", "1"),
            ])
            .send()
            .await?
            .error_for_status()?;
        parse_reply(reply).await
    }

    async fn poll(&self, request_id: &str) -> Result<ApiReply, SolverError> {
        let reply = self
            .client
            .get(format!("{}/res.php", self.api_base))
            .query(&[
                ("key", self.api_key.as_str()),
                ("action", "get"),
                ("id", request_id),
                ("json", "1"),
            ])
            .send()
            .await?
            .error_for_status()?;
        parse_reply(reply).await
    }
}

async fn parse_reply(response: reqwest::Response) -> Result<ApiReply, SolverError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| SolverError::InvalidResponse(format!("{e}: {body}")))
}

#[async_trait]
impl CaptchaSolver for TwoCaptchaSolver {
    async fn solve(&self, site_key: &str, page_url: &str) -> Result<Option<String>, SolverError> {
        let submitted = self.submit(site_key, page_url).await?;
        if submitted.status != 1 {
            tracing::warn!("Solver rejected challenge: {}", submitted.request);
            return Ok(None);
        }
        let request_id = submitted.request;
        tracing::debug!("Challenge submitted to solver as {}", request_id);

        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let reply = self.poll(&request_id).await?;
            if reply.status == 1 {
                tracing::info!("Challenge solved after {} polls", attempt);
                return Ok(Some(reply.request));
            }
            if reply.request != NOT_READY {
                tracing::warn!("Solver failed challenge {}: {}", request_id, reply.request);
                return Ok(None);
            }
        }

        tracing::warn!(
            "Solver did not finish challenge {} within {} polls",
            request_id,
            self.max_polls
        );
        Ok(None)
    }
}
