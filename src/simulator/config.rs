/// Load driver configuration.
use crate::error::AppError;
use std::time::Duration;

/// What a dispatch does when its request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Stop the whole run and report the error.
    Abort,
    /// Log the failure and drop the tick.
    Drop,
    /// Re-send with exponential backoff, dropping the tick once retries run out.
    Retry,
}

/// Immutable settings for one load run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Model to send requests to
    pub model: String,
    /// Target request rate in requests per second
    pub rate_hz: f64,
    /// Capacity of the completion channel
    pub queue_capacity: usize,
    /// Maximum dispatches allowed in flight at once
    pub max_in_flight: usize,
    /// Policy when no response is received
    pub transport_error: FailurePolicy,
    /// Policy when the server answers with a non-200 status
    pub status_error: FailurePolicy,
    /// Extra attempts for the `Retry` policy
    pub retries: u32,
    /// Stop after this long; `None` runs until cancelled
    pub duration: Option<Duration>,
}

impl DriverConfig {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 1024;
    pub const DEFAULT_RETRIES: u32 = 3;
    /// Longest accepted tick interval or run duration (ten years).
    pub const MAX_SPAN: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

    /// Create a config with default policies: drop on transport errors,
    /// abort on bad statuses.
    pub fn new(model: impl Into<String>, rate_hz: f64) -> Self {
        Self {
            model: model.into(),
            rate_hz,
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            max_in_flight: Self::DEFAULT_MAX_IN_FLIGHT,
            transport_error: FailurePolicy::Drop,
            status_error: FailurePolicy::Abort,
            retries: Self::DEFAULT_RETRIES,
            duration: None,
        }
    }

    /// Spacing between ticks, `1s / rate_hz`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` unless the rate is finite and positive and
    /// yields a non-zero period no longer than [`MAX_SPAN`](Self::MAX_SPAN).
    pub fn tick_interval(&self) -> Result<Duration, AppError> {
        if !self.rate_hz.is_finite() || self.rate_hz <= 0.0 {
            return Err(AppError::Config(format!(
                "Rate must be a positive number of requests per second, got {}",
                self.rate_hz
            )));
        }

        let period = Duration::try_from_secs_f64(1.0 / self.rate_hz).map_err(|e| {
            AppError::Config(format!("Rate {} gives an invalid interval: {}", self.rate_hz, e))
        })?;
        if period.is_zero() {
            return Err(AppError::Config(format!(
                "Rate {} is too high for the timer resolution",
                self.rate_hz
            )));
        }
        if period > Self::MAX_SPAN {
            return Err(AppError::Config(format!(
                "Rate {} is too low, ticks would be more than {}s apart",
                self.rate_hz,
                Self::MAX_SPAN.as_secs()
            )));
        }
        Ok(period)
    }

    /// Check every field before a run starts.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.model.trim().is_empty() {
            return Err(AppError::Config("Model name cannot be empty".to_string()));
        }
        self.tick_interval()?;
        if self.queue_capacity == 0 {
            return Err(AppError::Config(
                "Queue capacity must be at least 1".to_string(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(AppError::Config(
                "Max in-flight requests must be at least 1".to_string(),
            ));
        }
        if let Some(duration) = self.duration {
            if duration.is_zero() {
                return Err(AppError::Config("Duration must be non-zero".to_string()));
            }
            if duration > Self::MAX_SPAN {
                return Err(AppError::Config(format!(
                    "Duration must be at most {}s",
                    Self::MAX_SPAN.as_secs()
                )));
            }
        }
        Ok(())
    }

    /// Policy that applies to `err`. Anything that is neither a transport
    /// nor a status failure aborts.
    pub fn policy_for(&self, err: &AppError) -> FailurePolicy {
        if err.is_transport() {
            self.transport_error
        } else if err.is_status() {
            self.status_error
        } else {
            FailurePolicy::Abort
        }
    }

    /// Delay before retry number `attempt` (0-based): `2^attempt * 100ms`.
    pub fn backoff(attempt: u32) -> Duration {
        Duration::from_millis(100).saturating_mul(2u32.saturating_pow(attempt))
    }
}
