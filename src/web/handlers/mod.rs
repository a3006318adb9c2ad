//! # Web API Request Handlers
//!
//! Read-only monitoring endpoints, grouped by what they expose.

pub mod health;
pub mod orchestrations;
pub mod task_hubs;
