//! Platform API collaborator boundary
//!
//! All network interaction goes through the [`PlatformApi`] trait, grouped by
//! the platform's resource families (users, routing, analytics, audit). The
//! default implementation is the `reqwest`-backed [`http::HttpPlatformApi`];
//! tests substitute scripted implementations.
//!
//! Response bodies travel as raw [`serde_json::Value`] and are shape-checked
//! by [`crate::validate`] at each call site. The trait itself only raises the
//! typed transport errors in [`ApiError`].

use async_trait::async_trait;
use serde_json::Value;

pub mod http;

pub use http::HttpPlatformApi;

/// Result type for collaborator calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Typed errors raised by the API collaborator
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The supplied client credentials are not known to the platform
    #[error("client credentials not recognized: {0}")]
    IdentityNotFound(String),

    /// Authentication failed (expired or rejected token)
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The response body could not be parsed as the expected shape
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// The platform answered with a status code outside the expected set
    #[error("unexpected status code {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnosis
        body: String,
    },

    /// Transport-level failure (connect, timeout, retries exhausted)
    #[error("platform client error: {0}")]
    Internal(String),
}

/// Resource-scoped calls against the Platform API.
///
/// One method per endpoint this crate consumes. Paginated list calls accept
/// `(page_number, page_size)` and return `{entities[], pageCount}` bodies;
/// cursor calls accept `(page_size, cursor)` and return an array field plus an
/// optional `cursor`; job calls follow the submit/status/results/delete shape.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    // --- session ---

    /// Acquire a session (OAuth client-credentials token)
    async fn login(&self) -> ApiResult<()>;

    /// Release the session
    async fn logout(&self) -> ApiResult<()>;

    // --- users group ---

    /// One page of the organization's users
    async fn users_page(&self, page_number: u32, page_size: u32) -> ApiResult<Value>;

    // --- routing group ---

    /// One page of routing queues
    async fn queues_page(&self, page_number: u32, page_size: u32) -> ApiResult<Value>;

    /// One page of a queue's members
    async fn queue_members_page(
        &self,
        queue_id: &str,
        page_number: u32,
        page_size: u32,
    ) -> ApiResult<Value>;

    // --- analytics group: conversation details jobs ---

    /// Oldest queryable timestamp for conversation details
    async fn conversations_availability(&self) -> ApiResult<Value>;

    /// Submit a conversation details export job for an ISO-8601 interval
    async fn submit_conversation_details_job(&self, interval: &str) -> ApiResult<Value>;

    /// Current status of a conversation details job
    async fn conversation_details_job_status(&self, job_id: &str) -> ApiResult<Value>;

    /// One page of a fulfilled conversation details job's results
    async fn conversation_details_job_results(
        &self,
        job_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Value>;

    /// Delete a conversation details job
    async fn delete_conversation_details_job(&self, job_id: &str) -> ApiResult<()>;

    // --- analytics group: user details jobs ---

    /// Oldest queryable timestamp for user details
    async fn users_availability(&self) -> ApiResult<Value>;

    /// Submit a user details export job for an ISO-8601 interval
    async fn submit_user_details_job(&self, interval: &str) -> ApiResult<Value>;

    /// Current status of a user details job
    async fn user_details_job_status(&self, job_id: &str) -> ApiResult<Value>;

    /// One page of a fulfilled user details job's results
    async fn user_details_job_results(
        &self,
        job_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Value>;

    /// Delete a user details job
    async fn delete_user_details_job(&self, job_id: &str) -> ApiResult<()>;

    // --- audit group ---

    /// Submit an audit query for an ISO-8601 interval, optionally filtered to
    /// one entity type
    async fn submit_audit_query(
        &self,
        interval: &str,
        service_name: &str,
        entity_type: Option<&str>,
    ) -> ApiResult<Value>;

    /// Current status of an audit query
    async fn audit_query_status(&self, query_id: &str) -> ApiResult<Value>;

    /// One page of a completed audit query's results
    async fn audit_query_results(
        &self,
        query_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Value>;

    /// Delete an audit query
    async fn delete_audit_query(&self, query_id: &str) -> ApiResult<()>;
}
