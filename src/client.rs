//! Client facade tying lifecycle, pagination, and job orchestration together

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::api::{HttpPlatformApi, PlatformApi};
use crate::config::{ClientConfig, AUDIT_QUERY_DAYS};
use crate::error::{Error, Result};
use crate::interval::TimeRange;
use crate::jobs::{self, ExportKind};
use crate::lifecycle::{BeginOutcome, ConnectionState, Lifecycle, LifecycleEvent};
use crate::paging::{self, BatchStream};
use crate::validate::{self, FieldKind, FieldSpec};

const AVAILABILITY_SPECS: &[FieldSpec] =
    &[FieldSpec::new("dataAvailabilityDate", FieldKind::String)];

/// A client for bulk data retrieval from the Genesys Cloud Platform API.
///
/// Construction validates all arguments synchronously; nothing touches the
/// network until [`connect`](Client::connect). Every data operation requires
/// the client to be connected and returns a lazy stream of record batches;
/// dropping a stream mid-way stops iteration, with best-effort cleanup of any
/// job already submitted on the caller's behalf.
pub struct Client {
    api: Arc<dyn PlatformApi>,
    config: ClientConfig,
    lifecycle: Lifecycle,
}

impl Client {
    /// Create a client backed by the default HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let api = HttpPlatformApi::new(&config)?;
        Ok(Self::assemble(config, Arc::new(api)))
    }

    /// Create a client over a custom [`PlatformApi`] implementation
    /// (alternate transports, tests).
    pub fn with_api(config: ClientConfig, api: Arc<dyn PlatformApi>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, api))
    }

    fn assemble(config: ClientConfig, api: Arc<dyn PlatformApi>) -> Self {
        Self {
            api,
            config,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    /// Subscribe to lifecycle-change notifications. All listeners are
    /// released when the client reaches the closed state.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        self.lifecycle.subscribe()
    }

    /// Establish a session with the platform.
    ///
    /// A second call arriving while a connect is already in flight joins the
    /// same transition; the collaborator's login runs exactly once. From any
    /// state other than created/connecting this raises
    /// [`Error::ConnectUnavailable`].
    pub async fn connect(&self) -> Result<bool> {
        match self
            .lifecycle
            .begin(ConnectionState::Created, ConnectionState::Connecting)
        {
            BeginOutcome::Started => match self.api.login().await {
                Ok(()) => {
                    self.lifecycle.settle(ConnectionState::Connected);
                    info!("connected");
                    Ok(true)
                }
                Err(e) => {
                    self.lifecycle.settle(ConnectionState::Failed);
                    Err(e.into())
                }
            },
            BeginOutcome::AlreadyPending => {
                match self.lifecycle.wait_settled(ConnectionState::Connecting).await {
                    ConnectionState::Connected => Ok(true),
                    _ => Err(Error::TransitionFailed { op: "connect" }),
                }
            }
            BeginOutcome::Illegal(state) => Err(Error::ConnectUnavailable(state)),
        }
    }

    /// Release the session. Once closed, the client is not reusable.
    ///
    /// Calling close while a close is in flight joins it; calling it again
    /// after closing returns `Ok(true)` immediately. From any state other
    /// than connected/closing/closed this raises [`Error::CloseUnavailable`].
    pub async fn close(&self) -> Result<bool> {
        match self
            .lifecycle
            .begin(ConnectionState::Connected, ConnectionState::Closing)
        {
            BeginOutcome::Started => match self.api.logout().await {
                Ok(()) => {
                    self.lifecycle.settle(ConnectionState::Closed);
                    info!("closed");
                    Ok(true)
                }
                Err(e) => {
                    self.lifecycle.settle(ConnectionState::Failed);
                    Err(e.into())
                }
            },
            BeginOutcome::AlreadyPending => {
                match self.lifecycle.wait_settled(ConnectionState::Closing).await {
                    ConnectionState::Closed => Ok(true),
                    _ => Err(Error::TransitionFailed { op: "close" }),
                }
            }
            BeginOutcome::Illegal(ConnectionState::Closed) => Ok(true),
            BeginOutcome::Illegal(state) => Err(Error::CloseUnavailable(state)),
        }
    }

    // --- simple paginated listings ---

    /// Stream all users of the organization, one page per batch.
    pub fn users(&self) -> Result<BatchStream> {
        self.lifecycle.require_connected()?;
        let api = Arc::clone(&self.api);
        paging::page_stream(self.config.page_size, move |page, size| {
            let api = Arc::clone(&api);
            async move { api.users_page(page, size).await.map_err(Error::from) }
        })
    }

    /// Stream all routing queues, one page per batch.
    pub fn queues(&self) -> Result<BatchStream> {
        self.lifecycle.require_connected()?;
        let api = Arc::clone(&self.api);
        paging::page_stream(self.config.page_size, move |page, size| {
            let api = Arc::clone(&api);
            async move { api.queues_page(page, size).await.map_err(Error::from) }
        })
    }

    /// Stream the members of one queue, one page per batch.
    pub fn queue_members(&self, queue_id: &str) -> Result<BatchStream> {
        self.lifecycle.require_connected()?;
        if queue_id.trim().is_empty() {
            return Err(Error::InvalidArgument {
                name: "queue_id",
                reason: "must not be empty".to_string(),
            });
        }
        let api = Arc::clone(&self.api);
        let queue_id = queue_id.to_string();
        paging::page_stream(self.config.page_size, move |page, size| {
            let api = Arc::clone(&api);
            let queue_id = queue_id.clone();
            async move {
                api.queue_members_page(&queue_id, page, size)
                    .await
                    .map_err(Error::from)
            }
        })
    }

    // --- one-shot availability timestamps ---

    /// Newest timestamp for which conversation details are queryable.
    pub async fn conversations_availability(&self) -> Result<DateTime<Utc>> {
        self.lifecycle.require_connected()?;
        let body = self.api.conversations_availability().await?;
        Self::availability_from(&body)
    }

    /// Newest timestamp for which user details are queryable.
    pub async fn users_availability(&self) -> Result<DateTime<Utc>> {
        self.lifecycle.require_connected()?;
        let body = self.api.users_availability().await?;
        Self::availability_from(&body)
    }

    fn availability_from(body: &serde_json::Value) -> Result<DateTime<Utc>> {
        validate::require(body, AVAILABILITY_SPECS)?;
        let raw = validate::string_at(body, "dataAvailabilityDate")?;
        jobs::parse_timestamp(&raw, "dataAvailabilityDate")
    }

    // --- bulk exports ---

    /// Stream conversation detail records over `range`, chunked into one
    /// export job per configured span.
    pub async fn conversation_details(&self, range: TimeRange) -> Result<BatchStream> {
        self.export(ExportKind::ConversationDetails, range).await
    }

    /// Stream user detail records over `range`, chunked into one export job
    /// per configured span.
    pub async fn user_details(&self, range: TimeRange) -> Result<BatchStream> {
        self.export(ExportKind::UserDetails, range).await
    }

    async fn export(&self, kind: ExportKind, range: TimeRange) -> Result<BatchStream> {
        self.lifecycle.require_connected()?;

        let available = match kind {
            ExportKind::ConversationDetails => self.conversations_availability().await?,
            ExportKind::UserDetails => self.users_availability().await?,
        };
        if range.start() >= available {
            return Err(Error::DataUnavailable {
                start: range.start(),
                available,
            });
        }

        jobs::export_stream(
            Arc::clone(&self.api),
            kind,
            range,
            self.config.days_per_job,
            self.config.page_size,
        )
    }

    // --- audit log ---

    /// Stream audit events for `service_name` over `range`, optionally
    /// filtered to one entity type. Successive query submissions are spaced
    /// by the platform's minimum interval.
    pub fn audit_events(
        &self,
        range: TimeRange,
        service_name: &str,
        entity_type: Option<&str>,
    ) -> Result<BatchStream> {
        self.lifecycle.require_connected()?;
        if service_name.trim().is_empty() {
            return Err(Error::InvalidArgument {
                name: "service_name",
                reason: "must not be empty".to_string(),
            });
        }

        jobs::audit_stream(
            Arc::clone(&self.api),
            range,
            service_name.to_string(),
            entity_type.map(str::to_string),
            AUDIT_QUERY_DAYS,
            self.config.page_size,
        )
    }
}
