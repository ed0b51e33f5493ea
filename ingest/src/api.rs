use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::pacer::Interval;

/// How often and how patiently a timed out request is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_base: f64,
    pub jitter: Interval,
}

impl RetryPolicy {
    /// The exponential part of the delay before retrying after `attempt`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(self.backoff_base.powi(exponent)).unwrap_or(Duration::MAX)
    }

    pub fn delay<R>(&self, attempt: u32, rng: &mut R) -> Duration
    where
        R: rand::Rng + ?Sized,
    {
        self.base_delay(attempt).saturating_add(self.jitter.sample(rng))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base: 2.0,
            jitter: Interval::from_secs(5.0, 10.0),
        }
    }
}

pub struct Client {
    http: reqwest::Client,
    api_key: Option<String>,
    retry: RetryPolicy,
    calls: AtomicU64,
}

impl Client {
    pub fn new<IS>(
        api_key: Option<IS>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, reqwest::Error>
    where
        IS: Into<String>,
    {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key: api_key.map(Into::into),
            retry,
            calls: AtomicU64::new(0),
        })
    }

    /// Number of requests that got a successful response so far.
    pub fn api_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Fetches and decodes `url`.
    ///
    /// Failures are logged and turn into `None`, as does a `null` body.
    #[tracing::instrument(skip(self))]
    pub async fn get<T>(&self, url: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = self.get_json(url).await?;
        if value.is_null() {
            tracing::debug!("Empty response");
            return None;
        }

        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Decoding response: {}", e);
                None
            }
        }
    }

    async fn get_json(&self, url: &str) -> Option<serde_json::Value> {
        let attempts = self.retry.attempts.max(1);

        for attempt in 1..=attempts {
            let started = std::time::Instant::now();

            match self.fetch_body(url).await {
                Ok(body) => {
                    self.calls.fetch_add(1, Ordering::Relaxed);
                    return match serde_json::from_str(&body) {
                        Ok(v) => Some(v),
                        Err(e) => {
                            tracing::error!("Response is not JSON: {}", e);
                            None
                        }
                    };
                }
                Err(e) if e.is_timeout() => {
                    if attempt >= attempts {
                        tracing::error!(
                            attempt,
                            elapsed = ?started.elapsed(),
                            "Final timeout, skipping request"
                        );
                        return None;
                    }

                    let delay = self.retry.delay(attempt, &mut rand::thread_rng());
                    tracing::warn!(
                        attempt,
                        attempts,
                        ?delay,
                        "Timeout after {:?}, retrying",
                        started.elapsed()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(attempt, "Request failed: {}", e);
                    return None;
                }
            }
        }

        None
    }

    /// One attempt, including reading the whole body under the client timeout.
    async fn fetch_body(&self, url: &str) -> Result<String, reqwest::Error> {
        let mut request = self.http.get(url);
        if let Some(key) = self.api_key.as_ref() {
            request = request.bearer_auth(key);
        }

        request.send().await?.error_for_status()?.text().await
    }
}
