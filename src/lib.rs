//! # Genesys Cloud Bulk Data Client
//!
//! An async client for retrieving large datasets from the Genesys Cloud
//! Platform API as simple, lazy batch streams, while respecting the
//! platform's usage constraints (one job in flight per instance, minimum
//! spacing between audit query submissions, capped polling backoff).
//!
//! ## Features
//!
//! - **Paginated listings**: users, routing queues, and queue members over
//!   page-number/page-count pagination
//! - **Bulk detail exports**: conversation and user details over a date
//!   range, driven through the platform's asynchronous export jobs
//!   (submit, poll with backoff, drain results, best-effort cleanup)
//! - **Audit log retrieval**: audit queries per sub-interval with enforced
//!   minimum spacing between submissions
//! - **Connection lifecycle**: an explicit state machine gating every data
//!   operation, with lifecycle-change notifications for observers
//! - **Shape-checked responses**: every response contour is validated at the
//!   API boundary before any field is read
//!
//! ## Quick Start
//!
//! ```no_run
//! use genesys_bulk_client::{Client, ClientConfig, TimeRange};
//! use chrono::{TimeZone, Utc};
//! use futures_util::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("my-client-id", "my-client-secret", "eu-west-1")?;
//! let client = Client::new(config)?;
//! client.connect().await?;
//!
//! let range = TimeRange::new(
//!     Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
//! )?;
//!
//! let mut details = client.conversation_details(range).await?;
//! while let Some(batch) = details.next().await {
//!     for record in batch? {
//!         // process one conversation detail record
//!     }
//! }
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - The [`Client`] facade and its data operations
//! - [`lifecycle`] - Connection state machine and change notifications
//! - [`paging`] - Page-number and cursor pagination engines
//! - [`jobs`] - Export job / audit query orchestration
//! - [`interval`] - Date-range chunking and submission throttling
//! - [`api`] - The Platform API collaborator trait and HTTP implementation
//! - [`validate`] - Response shape validation
//! - [`region`] - Deployment regions and host resolution

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Platform API collaborator boundary
pub mod api;

/// Client facade
pub mod client;

/// Configuration and tuning constants
pub mod config;

/// Error taxonomy
pub mod error;

/// Time-interval chunking and submission throttling
pub mod interval;

/// Job and query orchestration
pub mod jobs;

/// Connection lifecycle state machine
pub mod lifecycle;

/// Pagination engines
pub mod paging;

/// Deployment regions
pub mod region;

/// Response shape validation
pub mod validate;

pub use api::{ApiError, PlatformApi};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use interval::TimeRange;
pub use lifecycle::{ConnectionState, LifecycleEvent};
pub use paging::{Batch, BatchStream};
pub use region::Region;
