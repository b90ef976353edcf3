use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Observation ──────────────────────────────────────────────────

/// One editor observation of a file: everything the host editor supplies
/// per activity or save callback. The aggregator never asks the editor
/// for anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Stable identifier of the document (file path).
    pub entity: String,
    /// Language id of the document ("rust", "typescript", ...).
    pub language: String,
    /// Workspace root path, or "unknown" when none resolves.
    pub project: String,
    /// Total line count of the document at observation time.
    pub line_count: i64,
    /// Cursor offset within the active line.
    pub cursorpos: i64,
}

// ─── Span table entries ───────────────────────────────────────────

/// Currently-open activity span for one entity. At most one exists per
/// entity; it is replaced (closed and reopened) when the activity type
/// changes and swept by the periodic flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySpan {
    /// Activity category ("coding", "debugging", ...).
    pub activity: String,
    /// When the span started.
    pub opened_at: DateTime<Utc>,
    /// Seconds attributed to this span so far.
    pub accumulated_secs: i64,
    /// Language id captured at span-open time.
    pub language: String,
    /// Project root captured at span-open time.
    pub project: String,
}

// ─── Outbound records ─────────────────────────────────────────────

/// Closed-span event record, one per span, sent to the collector exactly
/// once (no retry, no replay).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub activity: String,
    pub app: String,
    pub entity: String,
    /// Whole seconds attributed to the span.
    pub duration_secs: i64,
    pub project: String,
    pub language: String,
    pub end_timestamp: DateTime<Utc>,
}

/// Point-in-time heartbeat record. Emitted on every activity observation
/// and on every explicit save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    pub project: String,
    pub timestamp: DateTime<Utc>,
    pub entity: String,
    pub language: String,
    pub app: String,
    /// Absolute line-count delta since the previous heartbeat for this
    /// entity. Always >= 0; zero on the first observation of an entity.
    pub lines: i64,
    pub cursorpos: i64,
    pub is_write: bool,
}
