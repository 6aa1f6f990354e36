//! HTTP plumbing shared by the provider clients

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::time::{sleep, timeout};

use crate::error::{DomainScoutError, Result};
use crate::ratelimit::TokenBucket;

const USER_AGENT: &str = concat!("domain-scout/", env!("CARGO_PKG_VERSION"));

/// Delays applied between attempts. The first attempt is always immediate,
/// so `[0.5s, 1s, 2s]` means four attempts in total.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    backoff: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(backoff: Vec<Duration>) -> Self {
        Self { backoff }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    pub fn attempts(&self) -> usize {
        self.backoff.len() + 1
    }

    /// Delay before each attempt, starting with zero.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::once(Duration::ZERO).chain(self.backoff.iter().copied())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_millis(500),
            Duration::from_secs(1),
            Duration::from_secs(2),
        ])
    }
}

/// Build a client whose every request is bounded by `request_timeout`.
pub fn build_client(request_timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(request_timeout)
        .user_agent(USER_AGENT)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| DomainScoutError::config(format!("Failed to build HTTP client: {}", e)))
}

/// Run `attempt` under the provider's limiter and timeout, retrying
/// transient failures on the policy's schedule. Non-transient errors end
/// the loop at once.
pub async fn with_retry<T, F, Fut>(
    provider: &str,
    limiter: &TokenBucket,
    policy: &RetryPolicy,
    per_attempt: Duration,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for (number, delay) in policy.schedule().enumerate() {
        if !delay.is_zero() {
            sleep(delay).await;
        }
        limiter.acquire().await;

        let started = Instant::now();
        let result = match timeout(per_attempt, attempt()).await {
            // The client's own timeout carries no limit; it is the same one.
            Ok(Err(DomainScoutError::Timeout { operation, after: None })) => {
                Err(DomainScoutError::timeout(operation, per_attempt))
            }
            Ok(result) => result,
            Err(_) => Err(DomainScoutError::timeout(format!("{} request", provider), per_attempt)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                tracing::debug!(
                    provider = %provider,
                    attempt = number + 1,
                    duration_ms = %started.elapsed().as_millis(),
                    error = %e,
                    "Transient provider failure"
                );
                last_error = Some(e);
            }
            Err(e) => {
                tracing::debug!(provider = %provider, error = %e, "Provider failure is not retryable");
                return Err(e);
            }
        }
    }

    let error = last_error.unwrap_or_else(|| DomainScoutError::internal("retry schedule was empty"));
    tracing::warn!(
        provider = %provider,
        attempts = policy.attempts(),
        error = %error,
        "Provider retries exhausted"
    );
    Err(error)
}

/// Map a non-success status onto the error taxonomy.
pub fn status_error(provider: &str, status: StatusCode, url: &str) -> DomainScoutError {
    let code = status.as_u16();
    match code {
        401 | 403 => DomainScoutError::authentication(format!("{} rejected credentials ({})", provider, code)),
        429 => DomainScoutError::rate_limit(format!("{} throttled the request", provider), None),
        500..=599 => DomainScoutError::network(
            format!("{} answered {}", provider, status),
            Some(code),
            Some(url.to_string()),
        ),
        _ => DomainScoutError::protocol(provider, format!("unexpected status {}", status)),
    }
}

/// Read a successful response body as text, classifying failures.
pub async fn read_text(provider: &str, response: Response) -> Result<String> {
    let status = response.status();
    let url = response.url().to_string();
    if !status.is_success() {
        return Err(status_error(provider, status, &url));
    }
    response
        .text()
        .await
        .map_err(|e| DomainScoutError::network(e.to_string(), None, Some(url)))
}

/// Read a successful response body as JSON. An unparsable body is a
/// protocol error, not a transient one.
pub async fn read_json(provider: &str, response: Response) -> Result<Value> {
    let text = read_text(provider, response).await?;
    serde_json::from_str(&text)
        .map_err(|e| DomainScoutError::protocol(provider, format!("malformed JSON body: {}", e)))
}
