//! Fire-and-forget collector reporting.
//!
//! Records are handed over by value after the aggregation lock is
//! released; the span table already reflects the closure by the time a
//! report task runs, so a slow or failed collector call can never touch
//! a reopened span. Failures are logged and dropped: no retry, no
//! queueing, at-most-once per record.

use std::sync::Arc;

use codetrail_collector::{CollectorCommandRunner, event_args, heartbeat_args};
use codetrail_core::{EventRecord, HeartbeatRecord};

pub fn spawn_event_report<R: CollectorCommandRunner + 'static>(
    runner: Arc<R>,
    record: EventRecord,
) {
    let args = event_args(&record);
    tokio::spawn(async move {
        let entity = record.entity.clone();
        let outcome = tokio::task::spawn_blocking(move || runner.run(&args)).await;
        match outcome {
            Ok(Ok(())) => {
                tracing::info!(
                    "reported event: {} | {} | {}s",
                    record.activity,
                    record.entity,
                    record.duration_secs
                );
            }
            Ok(Err(e)) => tracing::warn!("event report failed for {entity}: {e}"),
            Err(e) => tracing::warn!("event report task failed for {entity}: {e}"),
        }
    });
}

pub fn spawn_heartbeat_report<R: CollectorCommandRunner + 'static>(
    runner: Arc<R>,
    record: HeartbeatRecord,
) {
    let args = heartbeat_args(&record);
    tokio::spawn(async move {
        let entity = record.entity.clone();
        let outcome = tokio::task::spawn_blocking(move || runner.run(&args)).await;
        match outcome {
            Ok(Ok(())) => {
                tracing::debug!(
                    "reported {} heartbeat: {} | {} lines",
                    if record.is_write { "write" } else { "edit" },
                    record.entity,
                    record.lines
                );
            }
            Ok(Err(e)) => tracing::warn!("heartbeat report failed for {entity}: {e}"),
            Err(e) => tracing::warn!("heartbeat report task failed for {entity}: {e}"),
        }
    });
}
