use estimator_core::{EstimatorError, Result};
use std::{future::Future, time::Duration};

/// Transport-level retry policy. Never applied to unparseable model output.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    fn next_delay(&self, current: Duration) -> Duration {
        if current >= self.max_delay {
            return self.max_delay;
        }
        let multiplier = self.backoff_multiplier.max(1.0) as f64;
        Duration::from_secs_f64(current.as_secs_f64() * multiplier).min(self.max_delay)
    }
}

#[must_use]
pub fn is_retryable_status_code(status_code: u16) -> bool {
    matches!(status_code, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Transport failures are reported as `EstimatorError::Model` with a
/// `retryable` marker or a timeout/connection message.
#[must_use]
pub fn is_retryable_model_error(error: &EstimatorError) -> bool {
    match error {
        EstimatorError::Model(message) => {
            let normalized = message.to_ascii_lowercase();
            normalized.contains(", retryable)")
                || normalized.contains("timed out")
                || normalized.contains("timeout")
                || normalized.contains("connection reset")
                || normalized.contains("connection refused")
        }
        _ => false,
    }
}

pub async fn execute_with_retry<T, Op, Fut, Classify>(
    retry_config: &RetryConfig,
    classify_error: Classify,
    mut operation: Op,
) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    Classify: Fn(&EstimatorError) -> bool,
{
    if !retry_config.enabled {
        return operation().await;
    }

    let mut attempt: u32 = 0;
    let mut delay = retry_config.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < retry_config.max_retries && classify_error(&error) => {
                attempt += 1;
                tracing::warn!(
                    attempt = attempt,
                    max_retries = retry_config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Model request failed with retryable error; retrying"
                );
                tokio::time::sleep(delay).await;
                delay = retry_config.next_delay(delay);
            }
            Err(error) => return Err(error),
        }
    }
}
