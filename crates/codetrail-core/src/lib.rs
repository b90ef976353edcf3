//! codetrail-core: pure in-memory aggregation engine for editor activity
//! telemetry. Holds the span table, line-count table, and global clock
//! cursor; produces the event and heartbeat records the runtime reports.
//!
//! No I/O lives here: `now` is always injected, so tests drive a
//! synthetic clock and call `record`/`flush` directly.

pub mod aggregator;
pub mod types;

pub use aggregator::{Aggregator, RecordOutcome, SpanAction};
pub use types::{ActivitySpan, EventRecord, HeartbeatRecord, Observation};

/// Entity-type tag attached to every record. Only file entities exist today.
pub const ENTITY_TYPE_FILE: &str = "file";

/// Sentinel for project/language when the editor cannot resolve one.
pub const UNKNOWN: &str = "unknown";
