//! # Query Builder
//!
//! Client query parameters turned into in-memory query operations.
//!
//! ## Key Components
//!
//! - [`filter_clause`] - `$filter` DSL: time range, runtime statuses and one field predicate
//! - [`fields`] - name-addressed field access for filtering and ordering
//! - [`ordering`] - `$orderby` parsing and stable sorting
//! - [`pagination`] - `$skip`/`$top` windows and backend page requests
//!
//! ## Example Usage
//!
//! ```rust
//! use durable_monitor::query_builder::{FilterClause, OrderBy, Pagination};
//!
//! let filter = FilterClause::parse("runtimeStatus in ('Failed') and name eq 'Orchestrator'");
//! assert_eq!(filter.runtime_statuses, Some(vec!["Failed".to_string()]));
//!
//! let order = OrderBy::parse("createdTime desc").unwrap();
//! assert!(order.descending);
//!
//! let window = Pagination::from_query(Some("10"), Some("5")).unwrap();
//! assert_eq!(window.skip(), 10);
//! ```

pub mod fields;
pub mod filter_clause;
pub mod ordering;
pub mod pagination;

pub use fields::{FieldAccess, FieldRegistry, FieldValue};
pub use filter_clause::{FieldPredicate, FilterClause, PredicateKind};
pub use ordering::OrderBy;
pub use pagination::Pagination;
