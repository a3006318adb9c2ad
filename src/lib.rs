#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Durable Functions Monitor
//!
//! Query engine behind a Durable Functions monitoring dashboard.
//!
//! ## Overview
//!
//! Orchestration state lives in two tables per task hub: an instances table
//! holding one status row per orchestration, and a history table holding the
//! raw event log. This crate turns those tables into the views a monitoring
//! UI needs:
//!
//! - a filtered, ordered, paged list of orchestrations and Durable Entities
//! - a per-instance detail record with its parent orchestration id
//! - a reconstructed execution timeline where each activity, sub-orchestration
//!   and timer appears once with its scheduled time and duration
//!
//! Every hub-scoped request is checked against an allow-list of known task
//! hubs before storage is touched.
//!
//! ## Module Organization
//!
//! - [`query_builder`] - `$filter` / `$orderby` / `$skip` / `$top` parsing
//! - [`history`] - lazy history reconstruction
//! - [`status`] - list and detail record assembly
//! - [`listing`] - staged instance and history query pipelines
//! - [`task_hubs`] - task hub name validation and the cached allow-list
//! - [`storage`] - backend trait with in-memory and PostgreSQL backends
//! - [`templates`] - custom tab template discovery
//! - [`auth`] - request gate
//! - [`web`] - axum HTTP surface
//! - [`config`] - configuration management
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use durable_monitor::listing::{InstanceLister, ListRequest};
//! use durable_monitor::storage::{InMemoryStorage, StorageConnections};
//! use durable_monitor::status::{StatusAggregator, StorageParentResolver};
//! use durable_monitor::history::StorageHistoryProvider;
//! use durable_monitor::templates::TabTemplates;
//! use std::sync::Arc;
//!
//! # async fn example() -> durable_monitor::Result<()> {
//! let connections = StorageConnections::new(Arc::new(InMemoryStorage::new()));
//! let aggregator = Arc::new(StatusAggregator::new(
//!     Arc::new(StorageHistoryProvider),
//!     Arc::new(StorageParentResolver::default()),
//!     Arc::new(TabTemplates::disabled()),
//! ));
//! let lister = InstanceLister::new(aggregator, 500);
//!
//! let request = ListRequest::from_query(
//!     Some("runtimeStatus in ('Failed') and name startswith 'Order'"),
//!     Some("createdTime desc"),
//!     None,
//!     Some("50"),
//!     None,
//! )?;
//! let failed = lister.list(&connections.resolve("OrdersHub"), &request).await?;
//! println!("{} failed order orchestrations", failed.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod history;
pub mod listing;
pub mod logging;
pub mod models;
pub mod query_builder;
pub mod status;
pub mod storage;
pub mod task_hubs;
pub mod templates;
pub mod web;

pub use config::{ConfigManager, MonitorConfig};
pub use constants::RuntimeStatus;
pub use error::{MonitorError, Result};
pub use listing::{HistoryRequest, InstanceLister, ListRequest};
pub use models::{
    DetailedOrchestrationStatus, ExpandedOrchestrationStatus, HiddenColumns, HistoryEvent,
    OrchestrationStatus,
};
pub use query_builder::FilterClause;
pub use storage::{DurableStorage, HubContext, StorageConnections};
pub use task_hubs::TaskHubValidator;
