//! Client configuration and tuning constants

use crate::error::{Error, Result};
use crate::region::Region;
use std::str::FromStr;
use std::time::Duration;

/// Largest page size the Platform API accepts for paginated listings
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size for paginated listings and job results
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Largest span a single detail export job may cover, in days
pub const MAX_DAYS_PER_JOB: i64 = 31;

/// Default span per detail export job, in days
pub const DEFAULT_DAYS_PER_JOB: i64 = 30;

/// Fixed span per audit query, in days. Audit queries reject wider intervals.
pub const AUDIT_QUERY_DAYS: i64 = 31;

/// Minimum spacing between successive audit query submissions.
/// The platform rejects faster submission with a 429 that is not worth
/// provoking; spacing is measured from the server-reported start time of the
/// previous query.
pub const MIN_SUBMISSION_GAP: Duration = Duration::from_secs(60);

/// Initial poll backoff for job/query status checks
pub const POLL_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Cap on the poll backoff
pub const POLL_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default socket timeout passed through to the HTTP transport
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

/// Default minimum spacing between individual HTTP requests
pub const DEFAULT_REQUEST_SPACING: Duration = Duration::from_millis(200);

/// Default retry budget for transient HTTP failures (429/5xx)
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff for retrying transient HTTP failures, in milliseconds
pub const HTTP_RETRY_INITIAL_MS: u64 = 1000;

/// Cap on the transient-failure retry backoff, in milliseconds
pub const HTTP_RETRY_MAX_MS: u64 = 30_000;

/// Grow a poll backoff delay: double it, clamped to [`POLL_MAX_DELAY`].
pub fn next_poll_delay(previous: Duration) -> Duration {
    (previous * 2).min(POLL_MAX_DELAY)
}

/// Exponential backoff for the Nth transient-failure retry (0-indexed)
pub fn retry_backoff(attempt: u32) -> Duration {
    let delay_ms = HTTP_RETRY_INITIAL_MS * 2u64.pow(attempt.min(10));
    Duration::from_millis(delay_ms.min(HTTP_RETRY_MAX_MS))
}

/// Configuration for a [`crate::Client`]
///
/// Transport tuning options (socket timeout, request spacing, max retries)
/// are passed through to the HTTP collaborator unchanged.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth client credential id
    pub client_id: String,
    /// OAuth client credential secret
    pub client_secret: String,
    /// Deployment region
    pub region: Region,
    /// Socket timeout for individual HTTP calls
    pub socket_timeout: Duration,
    /// Minimum spacing between individual HTTP calls
    pub request_spacing: Duration,
    /// Retry budget for transient HTTP failures
    pub max_retries: u32,
    /// Page size for paginated listings and job result draining
    pub page_size: u32,
    /// Span per detail export job, in days
    pub days_per_job: i64,
}

impl ClientConfig {
    /// Create a configuration from credentials and a region name.
    ///
    /// Validates all three synchronously; no network activity occurs here.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, region: &str) -> Result<Self> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(Error::InvalidArgument {
                name: "client_id",
                reason: "must not be empty".to_string(),
            });
        }

        let client_secret = client_secret.into();
        if client_secret.trim().is_empty() {
            return Err(Error::InvalidArgument {
                name: "client_secret",
                reason: "must not be empty".to_string(),
            });
        }

        let region = Region::from_str(region)?;

        Ok(Self {
            client_id,
            client_secret,
            region,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            request_spacing: DEFAULT_REQUEST_SPACING,
            max_retries: DEFAULT_MAX_RETRIES,
            page_size: DEFAULT_PAGE_SIZE,
            days_per_job: DEFAULT_DAYS_PER_JOB,
        })
    }

    /// Override the socket timeout
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    /// Override the minimum spacing between HTTP requests
    pub fn with_request_spacing(mut self, spacing: Duration) -> Self {
        self.request_spacing = spacing;
        self
    }

    /// Override the transient-failure retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the page size used for listings and result draining
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Override the span covered by each detail export job
    pub fn with_days_per_job(mut self, days: i64) -> Self {
        self.days_per_job = days;
        self
    }

    /// Check bounds that depend on fields settable after construction.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::PageSizeOutOfBounds {
                got: self.page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        if self.days_per_job <= 0 || self.days_per_job > MAX_DAYS_PER_JOB {
            return Err(Error::DaysPerJobOutOfBounds {
                got: self.days_per_job,
                max: MAX_DAYS_PER_JOB,
            });
        }
        if self.socket_timeout.is_zero() {
            return Err(Error::InvalidArgument {
                name: "socket_timeout",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
