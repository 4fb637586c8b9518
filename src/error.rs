//! Crate-wide error taxonomy
//!
//! Errors fall into five groups, mirrored by the variant ordering below:
//! argument validation (raised synchronously, before any network activity),
//! lifecycle state errors, remote response errors, business outcomes of
//! submitted jobs/queries, and statuses outside the known vocabulary.

use crate::api::ApiError;
use crate::lifecycle::ConnectionState;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --- argument validation ---
    /// A constructor argument failed validation
    #[error("invalid {name}: {reason}")]
    InvalidArgument {
        /// Name of the offending argument
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Page size outside the accepted range
    #[error("page size must be between 1 and {max}, got {got}")]
    PageSizeOutOfBounds {
        /// Value supplied by the caller
        got: u32,
        /// Largest accepted page size
        max: u32,
    },

    /// Chunk span outside the accepted range
    #[error("days per job must be between 1 and {max}, got {got}")]
    DaysPerJobOutOfBounds {
        /// Value supplied by the caller
        got: i64,
        /// Largest accepted span in days
        max: i64,
    },

    /// Requested interval has start >= end
    #[error("interval start ({start}) must be before end ({end})")]
    IntervalMismatch {
        /// Requested start of the interval
        start: DateTime<Utc>,
        /// Requested end of the interval
        end: DateTime<Utc>,
    },

    /// Requested start is at or after the platform's data availability point
    #[error("no data available at or after {available}; requested start {start}")]
    DataUnavailable {
        /// Requested start of the interval
        start: DateTime<Utc>,
        /// Availability timestamp reported by the platform
        available: DateTime<Utc>,
    },

    // --- lifecycle state ---
    /// connect() called from a state that does not permit it
    #[error("connect is unavailable while the client is {0}")]
    ConnectUnavailable(ConnectionState),

    /// close() called from a state that does not permit it
    #[error("close is unavailable while the client is {0}")]
    CloseUnavailable(ConnectionState),

    /// A data operation was attempted while not connected
    #[error("client is not connected (currently {0})")]
    NotConnected(ConnectionState),

    /// A joined connect/close observed the shared transition fail
    #[error("{op} did not complete; the client is now in the failed state")]
    TransitionFailed {
        /// Which lifecycle operation was joined
        op: &'static str,
    },

    // --- remote responses ---
    /// The collaborator's typed error, translated 1:1
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A response body was missing a required field or carried a wrong type
    #[error("incomplete response: {0}")]
    IncompleteResponse(String),

    // --- business outcomes ---
    /// A submitted job or query reached the failed state
    #[error("job {id} failed (last status: {status})")]
    JobFailed {
        /// Identifier of the failed job/query
        id: String,
        /// Last status body observed while polling
        status: Value,
    },

    /// A submitted job or query was cancelled server-side
    #[error("job {id} was cancelled (last status: {status})")]
    JobCancelled {
        /// Identifier of the cancelled job/query
        id: String,
        /// Last status body observed while polling
        status: Value,
    },

    /// An export job expired before its results could be drained
    #[error("job {id} expired before results could be fetched (last status: {status})")]
    JobExpired {
        /// Identifier of the expired job
        id: String,
        /// Last status body observed while polling
        status: Value,
    },

    // --- unknown vocabulary ---
    /// A job/query status outside the known vocabulary
    #[error("job {id} reported unrecognized state {state:?} (status: {status})")]
    UnexpectedJobState {
        /// Identifier of the job/query
        id: String,
        /// The unrecognized state string
        state: String,
        /// Full status body for diagnosis
        status: Value,
    },
}
