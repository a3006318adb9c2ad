//! # Instance History
//!
//! - [`reconstruction`] - lazy correlation of raw history rows into timeline events
//! - [`provider`] - pluggable history loading with a degraded inline-history path

pub mod provider;
pub mod reconstruction;

pub use provider::{HistoryProvider, HistorySequence, StorageHistoryProvider};
pub use reconstruction::{index_correlated, CorrelatedEvents, Reconstruction};
