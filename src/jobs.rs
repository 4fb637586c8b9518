//! Asynchronous job and query orchestration
//!
//! The two analytics detail exports (conversations, users) and the audit
//! query share one protocol: submit for a chunk's interval, poll with capped
//! exponential backoff until a terminal state, drain results through cursor
//! pagination, then delete the job best-effort. Chunks are processed strictly
//! in ascending time order, one job in flight at a time; the next chunk is
//! not submitted until the previous chunk's cleanup attempt has completed.
//!
//! A consumer that stops pulling the stream mid-drain abandons the job; a
//! [`CleanupGuard`] catches that case on drop and fires the deletion from a
//! spawned task so the platform is not left holding the job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::PlatformApi;
use crate::config::{next_poll_delay, MIN_SUBMISSION_GAP, POLL_INITIAL_DELAY};
use crate::error::{Error, Result};
use crate::interval::{SubmissionThrottle, TimeRange};
use crate::paging::{self, BatchStream};
use crate::validate::{self, FieldKind, FieldSpec};

/// The two bulk-export job variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Conversation detail records
    ConversationDetails,
    /// User status/presence detail records
    UserDetails,
}

/// Deletable server-side resources, for cleanup dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobResource {
    ConversationJob,
    UserJob,
    AuditQuery,
}

impl JobResource {
    fn results_field(self) -> &'static str {
        match self {
            JobResource::ConversationJob => "conversations",
            JobResource::UserJob => "userDetails",
            JobResource::AuditQuery => "entities",
        }
    }
}

/// Outcome of classifying one observed status string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Running,
    Fulfilled,
    Failed,
    Cancelled,
    Expired,
    Unknown,
}

/// Export jobs report SCREAMING_CASE states.
fn classify_export(state: &str) -> Verdict {
    match state {
        "QUEUED" | "PENDING" => Verdict::Running,
        "FULFILLED" => Verdict::Fulfilled,
        "FAILED" => Verdict::Failed,
        "CANCELLED" => Verdict::Cancelled,
        "EXPIRED" => Verdict::Expired,
        _ => Verdict::Unknown,
    }
}

/// Audit queries report TitleCase states and have no expiry.
fn classify_audit(state: &str) -> Verdict {
    match state {
        "Queued" | "Running" => Verdict::Running,
        "Succeeded" => Verdict::Fulfilled,
        "Failed" => Verdict::Failed,
        "Cancelled" => Verdict::Cancelled,
        _ => Verdict::Unknown,
    }
}

fn classify(resource: JobResource, state: &str) -> Verdict {
    match resource {
        JobResource::ConversationJob | JobResource::UserJob => classify_export(state),
        JobResource::AuditQuery => classify_audit(state),
    }
}

/// One chunk's server-side job, deleted exactly once.
///
/// The normal paths call [`CleanupGuard::finish`], which performs the
/// deletion inline before the driver moves on. Dropping an unfinished guard
/// (stream abandoned mid-drain) spawns the deletion instead.
struct CleanupGuard {
    api: Arc<dyn PlatformApi>,
    resource: JobResource,
    id: String,
    done: bool,
}

impl CleanupGuard {
    fn new(api: Arc<dyn PlatformApi>, resource: JobResource, id: String) -> Self {
        Self {
            api,
            resource,
            id,
            done: false,
        }
    }

    /// Attempt the deletion now; its outcome is logged and swallowed.
    async fn finish(mut self) {
        self.done = true;
        delete_resource(&self.api, self.resource, &self.id).await;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.done {
            let api = Arc::clone(&self.api);
            let resource = self.resource;
            let id = std::mem::take(&mut self.id);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    delete_resource(&api, resource, &id).await;
                });
            } else {
                warn!("job {} abandoned outside a runtime; skipping cleanup", id);
            }
        }
    }
}

/// Best-effort deletion; never surfaced, never retried.
async fn delete_resource(api: &Arc<dyn PlatformApi>, resource: JobResource, id: &str) {
    let result = match resource {
        JobResource::ConversationJob => api.delete_conversation_details_job(id).await,
        JobResource::UserJob => api.delete_user_details_job(id).await,
        JobResource::AuditQuery => api.delete_audit_query(id).await,
    };
    match result {
        Ok(()) => debug!("cleaned up job {}", id),
        Err(e) => warn!("best-effort cleanup of job {} failed: {}", id, e),
    }
}

/// Per-variant submission bindings; everything after submission is shared.
#[async_trait]
trait BulkResource: Send + 'static {
    fn resource(&self) -> JobResource;

    /// Submit a job/query covering `chunk`, returning its identifier.
    async fn submit(&mut self, api: &Arc<dyn PlatformApi>, chunk: &TimeRange) -> Result<String>;
}

struct ExportResource {
    kind: ExportKind,
}

const EXPORT_SUBMIT_SPECS: &[FieldSpec] = &[FieldSpec::new("jobId", FieldKind::String)];

#[async_trait]
impl BulkResource for ExportResource {
    fn resource(&self) -> JobResource {
        match self.kind {
            ExportKind::ConversationDetails => JobResource::ConversationJob,
            ExportKind::UserDetails => JobResource::UserJob,
        }
    }

    async fn submit(&mut self, api: &Arc<dyn PlatformApi>, chunk: &TimeRange) -> Result<String> {
        let interval = chunk.to_interval_string();
        let body = match self.kind {
            ExportKind::ConversationDetails => {
                api.submit_conversation_details_job(&interval).await?
            }
            ExportKind::UserDetails => api.submit_user_details_job(&interval).await?,
        };
        validate::require(&body, EXPORT_SUBMIT_SPECS)?;
        let id = validate::string_at(&body, "jobId")?;
        info!("submitted {:?} job {} for {}", self.kind, id, interval);
        Ok(id)
    }
}

struct AuditResource {
    service_name: String,
    entity_type: Option<String>,
    throttle: SubmissionThrottle,
}

const AUDIT_SUBMIT_SPECS: &[FieldSpec] = &[
    FieldSpec::new("id", FieldKind::String),
    FieldSpec::new("state", FieldKind::String),
    FieldSpec::new("startDate", FieldKind::String),
];

#[async_trait]
impl BulkResource for AuditResource {
    fn resource(&self) -> JobResource {
        JobResource::AuditQuery
    }

    async fn submit(&mut self, api: &Arc<dyn PlatformApi>, chunk: &TimeRange) -> Result<String> {
        self.throttle.pause().await;

        let interval = chunk.to_interval_string();
        let body = api
            .submit_audit_query(&interval, &self.service_name, self.entity_type.as_deref())
            .await?;
        validate::require(&body, AUDIT_SUBMIT_SPECS)?;
        let id = validate::string_at(&body, "id")?;

        // Spacing for the *next* submission is measured from the server's
        // reported start time, not the local submission instant.
        let start_date = validate::string_at(&body, "startDate")?;
        let server_start = parse_timestamp(&start_date, "startDate")?;
        self.throttle.record(server_start);

        info!("submitted audit query {} for {}", id, interval);
        Ok(id)
    }
}

/// Parse an ISO-8601 timestamp field into UTC.
pub(crate) fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            Error::IncompleteResponse(format!(
                "field {field:?} is not a valid ISO-8601 timestamp ({raw:?}: {e})"
            ))
        })
}

const STATUS_SPECS: &[FieldSpec] = &[FieldSpec::new("state", FieldKind::String)];

/// Poll a job until it reaches a terminal state.
///
/// The backoff counter doubles before every poll and is clamped to the
/// configured cap, so waits run 2s, 4s, ... up to 60s. Unknown status strings
/// are a hard error, never a silent retry.
async fn poll_until_terminal(
    api: &Arc<dyn PlatformApi>,
    resource: JobResource,
    id: &str,
) -> Result<()> {
    let mut delay = POLL_INITIAL_DELAY;

    loop {
        delay = next_poll_delay(delay);
        debug!("waiting {:?} before polling job {}", delay, id);
        tokio::time::sleep(delay).await;

        let body = match resource {
            JobResource::ConversationJob => api.conversation_details_job_status(id).await?,
            JobResource::UserJob => api.user_details_job_status(id).await?,
            JobResource::AuditQuery => api.audit_query_status(id).await?,
        };
        validate::require(&body, STATUS_SPECS)?;
        let state = validate::string_at(&body, "state")?;

        match classify(resource, &state) {
            Verdict::Running => {
                debug!("job {} still {}", id, state);
            }
            Verdict::Fulfilled => {
                info!("job {} fulfilled", id);
                return Ok(());
            }
            Verdict::Failed => {
                return Err(Error::JobFailed {
                    id: id.to_string(),
                    status: body,
                })
            }
            Verdict::Cancelled => {
                return Err(Error::JobCancelled {
                    id: id.to_string(),
                    status: body,
                })
            }
            Verdict::Expired => {
                return Err(Error::JobExpired {
                    id: id.to_string(),
                    status: body,
                })
            }
            Verdict::Unknown => {
                return Err(Error::UnexpectedJobState {
                    id: id.to_string(),
                    state,
                    status: body,
                })
            }
        }
    }
}

/// Drain a terminal job's results through the cursor pagination engine.
fn results_pages(
    api: &Arc<dyn PlatformApi>,
    resource: JobResource,
    id: String,
    page_size: u32,
) -> Result<BatchStream> {
    let api = Arc::clone(api);
    paging::cursor_stream(resource.results_field(), page_size, move |cursor, size| {
        let api = Arc::clone(&api);
        let id = id.clone();
        async move {
            let result = match resource {
                JobResource::ConversationJob => {
                    api.conversation_details_job_results(&id, size, cursor.as_deref())
                        .await
                }
                JobResource::UserJob => {
                    api.user_details_job_results(&id, size, cursor.as_deref()).await
                }
                JobResource::AuditQuery => {
                    api.audit_query_results(&id, size, cursor.as_deref()).await
                }
            };
            result.map_err(Error::from)
        }
    })
}

/// Where the per-chunk protocol currently stands
enum Phase {
    NextChunk,
    Drain { guard: CleanupGuard, pages: BatchStream },
    Finished,
}

struct Drive<R: BulkResource> {
    api: Arc<dyn PlatformApi>,
    res: R,
    page_size: u32,
    chunks: std::vec::IntoIter<TimeRange>,
    phase: Phase,
}

/// Run the shared submit → poll → drain → cleanup protocol over `chunks`,
/// yielding one batch per results page.
fn bulk_stream<R: BulkResource>(
    api: Arc<dyn PlatformApi>,
    res: R,
    chunks: Vec<TimeRange>,
    page_size: u32,
) -> BatchStream {
    let drive = Drive {
        api,
        res,
        page_size,
        chunks: chunks.into_iter(),
        phase: Phase::NextChunk,
    };

    let stream = stream::unfold(drive, |mut drive| async move {
        loop {
            match std::mem::replace(&mut drive.phase, Phase::Finished) {
                Phase::Finished => return None,

                Phase::NextChunk => {
                    let Some(chunk) = drive.chunks.next() else {
                        return None;
                    };
                    let resource = drive.res.resource();

                    let id = match drive.res.submit(&drive.api, &chunk).await {
                        Ok(id) => id,
                        Err(e) => return Some((Err(e), drive)),
                    };
                    let guard = CleanupGuard::new(Arc::clone(&drive.api), resource, id.clone());

                    if let Err(e) = poll_until_terminal(&drive.api, resource, &id).await {
                        // Cleanup is attempted before the failure surfaces.
                        guard.finish().await;
                        return Some((Err(e), drive));
                    }

                    match results_pages(&drive.api, resource, id, drive.page_size) {
                        Ok(pages) => drive.phase = Phase::Drain { guard, pages },
                        Err(e) => {
                            guard.finish().await;
                            return Some((Err(e), drive));
                        }
                    }
                }

                Phase::Drain { guard, mut pages } => match pages.next().await {
                    Some(Ok(batch)) => {
                        drive.phase = Phase::Drain { guard, pages };
                        return Some((Ok(batch), drive));
                    }
                    Some(Err(e)) => {
                        guard.finish().await;
                        return Some((Err(e), drive));
                    }
                    // Pages exhausted: clean up, then move to the next chunk
                    // before anything else is submitted.
                    None => {
                        guard.finish().await;
                        drive.phase = Phase::NextChunk;
                    }
                },
            }
        }
    });

    Box::pin(stream)
}

/// Stream a bulk detail export across `range`, one job per chunk.
pub(crate) fn export_stream(
    api: Arc<dyn PlatformApi>,
    kind: ExportKind,
    range: TimeRange,
    days_per_job: i64,
    page_size: u32,
) -> Result<BatchStream> {
    paging::ensure_page_size(page_size)?;
    let chunks = range.chunks(days_per_job)?;
    Ok(bulk_stream(api, ExportResource { kind }, chunks, page_size))
}

/// Stream audit events across `range`, one throttled query per chunk.
pub(crate) fn audit_stream(
    api: Arc<dyn PlatformApi>,
    range: TimeRange,
    service_name: String,
    entity_type: Option<String>,
    chunk_days: i64,
    page_size: u32,
) -> Result<BatchStream> {
    paging::ensure_page_size(page_size)?;
    let chunks = range.chunks(chunk_days)?;
    let res = AuditResource {
        service_name,
        entity_type,
        throttle: SubmissionThrottle::new(MIN_SUBMISSION_GAP),
    };
    Ok(bulk_stream(api, res, chunks, page_size))
}
