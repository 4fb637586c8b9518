//! Time-interval chunking and submission rate limiting
//!
//! Long date ranges are split into platform-accepted sub-ranges before being
//! turned into export jobs or audit queries. Submission-rate-limited
//! endpoints additionally get a minimum spacing between successive
//! submissions, measured from the server-reported start time of the previous
//! submission so that server queuing delay and clock skew are absorbed.

use crate::config::MAX_DAYS_PER_JOB;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use std::time::Duration;
use tracing::debug;

/// A half-open `[start, end)` time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, rejecting `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::IntervalMismatch { start, end });
        }
        Ok(Self { start, end })
    }

    /// Start of the range (inclusive)
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the range (exclusive)
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Render as the platform's `<ISO8601>/<ISO8601>` interval string
    pub fn to_interval_string(&self) -> String {
        format!(
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    /// Split into consecutive sub-ranges of at most `days` days.
    ///
    /// Chunks are non-overlapping, ascending, and cover the range exactly
    /// once; the final chunk may be shorter than `days`.
    pub fn chunks(&self, days: i64) -> Result<Vec<TimeRange>> {
        if days <= 0 || days > MAX_DAYS_PER_JOB {
            return Err(Error::DaysPerJobOutOfBounds {
                got: days,
                max: MAX_DAYS_PER_JOB,
            });
        }

        let span = ChronoDuration::days(days);
        let mut chunks = Vec::new();
        let mut cursor = self.start;

        while cursor < self.end {
            let chunk_end = std::cmp::min(cursor + span, self.end);
            chunks.push(TimeRange {
                start: cursor,
                end: chunk_end,
            });
            cursor = chunk_end;
        }

        debug!(
            "split {} into {} chunk(s) of at most {} day(s)",
            self.to_interval_string(),
            chunks.len(),
            days
        );
        Ok(chunks)
    }
}

/// Minimum-spacing gate for submission-rate-limited endpoints
#[derive(Debug)]
pub struct SubmissionThrottle {
    min_gap: Duration,
    last_submission: Option<DateTime<Utc>>,
}

impl SubmissionThrottle {
    /// Create a throttle enforcing `min_gap` between submissions
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_submission: None,
        }
    }

    /// Suspend until the minimum gap since the last recorded submission has
    /// elapsed. The first submission never waits.
    pub async fn pause(&self) {
        let Some(last) = self.last_submission else {
            return;
        };
        let gap = ChronoDuration::from_std(self.min_gap).unwrap_or(ChronoDuration::zero());
        let wait = last + gap - Utc::now();
        if let Ok(wait) = wait.to_std() {
            if !wait.is_zero() {
                debug!("throttling submission for {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Record the server-reported start time of the submission just made.
    pub fn record(&mut self, server_start: DateTime<Utc>) {
        self.last_submission = Some(server_start);
    }
}
