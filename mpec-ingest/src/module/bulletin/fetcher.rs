///! Bulletin fetcher
///!
///! Retrieves one bulletin page per sequence number. A 404 for the requested
///! number means the half-month has no more bulletins; transport faults are
///! retried with linear backoff before being reported.

use async_trait::async_trait;
use mpec_common::BulletinSequence;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;

use super::types::FetchedBulletin;
use crate::config::FetchConfig;
use crate::error::FetchError;

/// Source of raw bulletin pages.
#[async_trait]
pub trait BulletinSource: Send + Sync {
    async fn fetch(&self, sequence: &BulletinSequence) -> Result<FetchedBulletin, FetchError>;
}

/// Failure of one attempt, before the retry policy decides what it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    NotFound,
    Transport(String),
}

/// Bounded retry with linear backoff: attempt `k` is followed by a `k * delay` pause.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.delay * attempt
    }

    pub async fn run<F, Fut, T>(&self, bulletin: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut last_message = String::new();

        for attempt in 1..=self.max_attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::NotFound) => {
                    return Err(FetchError::EndOfSequence {
                        bulletin: bulletin.to_string(),
                    });
                }
                Err(AttemptError::Transport(message)) => {
                    tracing::warn!(
                        "Fetching {} failed (attempt {}/{}): {}",
                        bulletin,
                        attempt,
                        self.max_attempts,
                        message
                    );
                    last_message = message;
                }
            }

            if attempt < self.max_attempts {
                let delay = self.delay_after(attempt);
                tracing::debug!("Retrying {} in {:?}...", bulletin, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(FetchError::Transient {
            bulletin: bulletin.to_string(),
            attempts: self.max_attempts,
            message: last_message,
        })
    }
}

/// HTTP implementation against the public bulletin archive.
pub struct HttpBulletinSource {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpBulletinSource {
    pub fn new(base_url: &str, config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            retry: RetryPolicy::new(config.max_attempts, Duration::from_millis(config.retry_delay_ms)),
        })
    }

    async fn fetch_once(client: &Client, url: &str) -> Result<Vec<u8>, AttemptError> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(AttemptError::NotFound);
        }
        if !status.is_success() {
            return Err(AttemptError::Transport(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transport(format!("failed to read body: {}", e)))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl BulletinSource for HttpBulletinSource {
    async fn fetch(&self, sequence: &BulletinSequence) -> Result<FetchedBulletin, FetchError> {
        let url = sequence.url(&self.base_url)?;
        let bulletin = sequence.bulletin_id();
        tracing::debug!("Fetching {} from {}", bulletin, url);

        let client = &self.client;
        let target = url.as_str();
        let raw = self
            .retry
            .run(&bulletin, |_| Self::fetch_once(client, target))
            .await?;

        Ok(FetchedBulletin::new(*sequence, url, raw))
    }
}
