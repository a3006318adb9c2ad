//! # History Reconstruction
//!
//! Single forward pass over an instance's time-ordered history rows that
//! folds each scheduling row and its completion into one [`HistoryEvent`].
//!
//! | Row type | Output |
//! |---|---|
//! | `ExecutionStarted` | emitted, remembered for the run duration |
//! | `TaskScheduled`, `SubOrchestrationInstanceCreated` | merged with the completion whose `task_scheduled_id` equals this row's `event_id`, else emitted alone |
//! | `ExecutionCompleted`, `ExecutionFailed`, `ExecutionTerminated` | emitted with the run's start as scheduled time |
//! | `ContinueAsNew`, `TimerCreated`, `TimerFired`, `EventRaised`, `EventSent` | emitted as is |
//! | anything else | dropped |
//!
//! [`Reconstruction`] is an iterator: rows are only examined as events are
//! pulled, so a consumer that takes a prefix never walks the rest of the
//! table. It is not resumable; rebuild it from the same input to start over.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::constants::event_types;
use crate::models::{HistoryEvent, RawHistoryEntity};

/// Completion rows indexed by the `event_id` of the row that scheduled them
pub type CorrelatedEvents = HashMap<i32, RawHistoryEntity>;

/// Build the correlation side table. The first row for a key wins.
pub fn index_correlated(rows: impl IntoIterator<Item = RawHistoryEntity>) -> CorrelatedEvents {
    let mut index = CorrelatedEvents::new();
    for row in rows {
        if let Some(task_scheduled_id) = row.task_scheduled_id {
            index.entry(task_scheduled_id).or_insert(row);
        }
    }
    index
}

pub struct Reconstruction<I> {
    rows: I,
    correlated: CorrelatedEvents,
    execution_started: Option<DateTime<Utc>>,
}

impl<I> Reconstruction<I>
where
    I: Iterator<Item = RawHistoryEntity>,
{
    pub fn new<R>(rows: R, correlated: CorrelatedEvents) -> Self
    where
        R: IntoIterator<IntoIter = I>,
    {
        Self {
            rows: rows.into_iter(),
            correlated,
            execution_started: None,
        }
    }

    fn convert(&mut self, row: RawHistoryEntity) -> Option<HistoryEvent> {
        match row.event_type.as_str() {
            event_types::EXECUTION_STARTED => {
                self.execution_started = Some(row.timestamp);
                Some(HistoryEvent::from_raw(&row))
            }
            event_types::TASK_SCHEDULED | event_types::SUB_ORCHESTRATION_CREATED => {
                let completion = row.event_id.and_then(|id| self.correlated.get(&id));
                Some(match completion {
                    Some(completion) => merge(&row, completion),
                    None => HistoryEvent::from_raw(&row),
                })
            }
            event_types::EXECUTION_COMPLETED
            | event_types::EXECUTION_FAILED
            | event_types::EXECUTION_TERMINATED => {
                let mut event = HistoryEvent::from_raw(&row);
                if let Some(started) = self.execution_started {
                    event.scheduled_time = Some(started);
                    event.duration_in_ms = (row.timestamp - started).num_milliseconds();
                }
                Some(event)
            }
            event_types::CONTINUE_AS_NEW
            | event_types::TIMER_CREATED
            | event_types::TIMER_FIRED
            | event_types::EVENT_RAISED
            | event_types::EVENT_SENT => Some(HistoryEvent::from_raw(&row)),
            _ => None,
        }
    }
}

impl<I> Iterator for Reconstruction<I>
where
    I: Iterator<Item = RawHistoryEntity>,
{
    type Item = HistoryEvent;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(row) = self.rows.next() {
            if let Some(event) = self.convert(row) {
                return Some(event);
            }
        }
        None
    }
}

/// Scheduling row's identity and timing joined with the completion's outcome
fn merge(scheduled: &RawHistoryEntity, completion: &RawHistoryEntity) -> HistoryEvent {
    let event_type = if completion.event_type == event_types::GENERIC_EVENT {
        scheduled.event_type.clone()
    } else {
        completion.event_type.clone()
    };

    HistoryEvent {
        timestamp: completion.timestamp,
        event_type,
        event_id: scheduled.event_id,
        name: scheduled.name.clone(),
        scheduled_time: Some(scheduled.timestamp),
        duration_in_ms: (completion.timestamp - scheduled.timestamp).num_milliseconds(),
        sub_orchestration_id: scheduled.instance_id.clone(),
        result: completion.result.clone(),
        details: completion.details.clone(),
    }
}
