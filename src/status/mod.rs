//! # Orchestration Status
//!
//! - [`background`] - non-blocking values filled in by spawned tasks
//! - [`parent_resolver`] - pluggable parent instance lookup
//! - [`aggregator`] - list and detail view construction

pub mod aggregator;
pub mod background;
pub mod parent_resolver;

pub use aggregator::{StatusAggregator, PARENT_INSTANCE_COLUMN};
pub use background::{BackgroundValue, ValueState};
pub use parent_resolver::{ParentInstanceResolver, StorageParentResolver};
