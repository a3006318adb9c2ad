//! # Background Values
//!
//! A string produced by a spawned task and read later without blocking.
//!
//! At any observation point a value is exactly one of pending, resolved or
//! faulted. [`BackgroundValue::peek`] never waits and never fails: pending and
//! faulted values read as the empty string.

use futures::FutureExt;
use serde::{Serialize, Serializer};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::watch;
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueState {
    Pending,
    Resolved(String),
    Faulted,
}

#[derive(Debug, Clone)]
pub struct BackgroundValue {
    receiver: watch::Receiver<ValueState>,
}

impl BackgroundValue {
    /// Already-resolved value
    pub fn resolved(value: impl Into<String>) -> Self {
        let (_, receiver) = watch::channel(ValueState::Resolved(value.into()));
        Self { receiver }
    }

    /// Resolved to the empty string; used when resolution is not requested
    pub fn empty() -> Self {
        Self::resolved(String::new())
    }

    /// Spawn `work` on the runtime and expose its outcome.
    ///
    /// `Ok(None)` resolves to the empty string. Errors and panics fault the
    /// value; neither escapes the task.
    pub fn spawn<F>(label: &'static str, work: F) -> Self
    where
        F: Future<Output = Result<Option<String>>> + Send + 'static,
    {
        let (sender, receiver) = watch::channel(ValueState::Pending);

        tokio::spawn(async move {
            let state = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(value)) => ValueState::Resolved(value.unwrap_or_default()),
                Ok(Err(e)) => {
                    warn!(value = label, error = %e, "Background value faulted");
                    ValueState::Faulted
                }
                Err(_) => {
                    warn!(value = label, "Background value panicked");
                    ValueState::Faulted
                }
            };
            // Nobody listening is fine
            let _ = sender.send(state);
        });

        Self { receiver }
    }

    /// Current state snapshot
    pub fn state(&self) -> ValueState {
        self.receiver.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.receiver.borrow(), ValueState::Pending)
    }

    /// Best currently-available value
    pub fn peek(&self) -> String {
        match &*self.receiver.borrow() {
            ValueState::Resolved(value) => value.clone(),
            ValueState::Pending | ValueState::Faulted => String::new(),
        }
    }

    /// Wait until the value is no longer pending, then read it
    pub async fn settled(&self) -> String {
        let mut receiver = self.receiver.clone();
        let value = match receiver
            .wait_for(|state| !matches!(state, ValueState::Pending))
            .await
        {
            Ok(state) => match &*state {
                ValueState::Resolved(value) => value.clone(),
                _ => String::new(),
            },
            // Producer dropped without a result
            Err(_) => String::new(),
        };
        value
    }
}

impl Serialize for BackgroundValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.peek())
    }
}
