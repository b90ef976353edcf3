//! Span aggregation state machine.
//!
//! Owns the per-entity span table, the per-entity line-count table, and
//! the process-wide clock cursor. Rules:
//!
//! - **Open**: first observation for an entity opens a span with zero
//!   accumulated duration.
//! - **Extend**: a same-activity observation adds `now - last_activity`
//!   to the open span, where `last_activity` is the GLOBAL cursor (the
//!   last observation of any entity, not this one's).
//! - **Restart**: an activity change closes the old span (producing one
//!   event record) and opens a fresh span at zero.
//! - **Flush**: [`Aggregator::flush`] closes every open span
//!   unconditionally; the runtime calls it on a fixed period, so
//!   sustained activity on one file is reported as interval-sized
//!   chunks.
//!
//! The aggregator produces records; it never performs I/O. Callers must
//! remove-then-report: a record returned here is already gone from the
//! table, so a late or failed report can never clobber a reopened span.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::{ActivitySpan, EventRecord, HeartbeatRecord, Observation};

// ─── Outcome ─────────────────────────────────────────────────────────

/// What [`Aggregator::record`] did to the entity's span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanAction {
    /// No span existed; a new one was opened.
    Opened,
    /// Same activity; the open span's duration was extended.
    Extended,
    /// Activity changed; the old span was closed and a fresh one opened.
    Restarted,
}

/// Result of one activity observation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub action: SpanAction,
    /// Closing record for the previous span, present only on
    /// [`SpanAction::Restarted`].
    pub closed: Option<EventRecord>,
    /// Heartbeat emitted for this observation (every observation emits
    /// exactly one, with the write flag clear).
    pub heartbeat: HeartbeatRecord,
    /// Accumulated seconds on the entity's span after this observation.
    pub span_secs: i64,
}

// ─── Aggregator ──────────────────────────────────────────────────────

/// In-memory aggregation state. Single-writer: the runtime serializes
/// all calls behind one lock.
#[derive(Debug)]
pub struct Aggregator {
    /// Fixed application tag stamped on every outbound record.
    app: String,
    /// Open span per entity. Invariant: at most one per entity.
    spans: HashMap<String, ActivitySpan>,
    /// Last-observed line count per entity. Never swept; bounded by
    /// entity churn, not time.
    line_counts: HashMap<String, i64>,
    /// Global clock cursor: when the last observation of ANY entity was
    /// processed. Duration increments are measured against this, not a
    /// per-entity timestamp.
    last_activity: DateTime<Utc>,
}

impl Aggregator {
    pub fn new(app: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            app: app.into(),
            spans: HashMap::new(),
            line_counts: HashMap::new(),
            last_activity: now,
        }
    }

    /// Process one activity observation.
    ///
    /// Opens, extends, or restarts the entity's span, advances the
    /// global clock cursor, and emits one heartbeat. Infallible: bad or
    /// missing upstream context is the intake layer's problem.
    pub fn record(
        &mut self,
        obs: &Observation,
        activity: &str,
        now: DateTime<Utc>,
    ) -> RecordOutcome {
        let (action, closed) = match self.spans.get_mut(&obs.entity) {
            Some(span) if span.activity == activity => {
                span.accumulated_secs += now.signed_duration_since(self.last_activity).num_seconds();
                (SpanAction::Extended, None)
            }
            Some(_) => {
                let closed = self.close_span(&obs.entity, now);
                self.open_span(obs, activity, now);
                (SpanAction::Restarted, closed)
            }
            None => {
                self.open_span(obs, activity, now);
                (SpanAction::Opened, None)
            }
        };

        self.last_activity = now;

        let span_secs = self
            .spans
            .get(&obs.entity)
            .map(|s| s.accumulated_secs)
            .unwrap_or(0);

        // Every activity observation also produces one heartbeat.
        let heartbeat = self.heartbeat(obs, false, now);

        RecordOutcome {
            action,
            closed,
            heartbeat,
            span_secs,
        }
    }

    fn open_span(&mut self, obs: &Observation, activity: &str, now: DateTime<Utc>) {
        self.spans.insert(
            obs.entity.clone(),
            ActivitySpan {
                activity: activity.to_owned(),
                opened_at: now,
                accumulated_secs: 0,
                language: obs.language.clone(),
                project: obs.project.clone(),
            },
        );
    }

    /// Close the entity's open span and build its event record. No-op
    /// when no span is open. The span is removed from the table before
    /// the record is handed back, regardless of what the caller does
    /// with it: at-most-once delivery, no retry.
    pub fn close_span(&mut self, entity: &str, now: DateTime<Utc>) -> Option<EventRecord> {
        let span = self.spans.remove(entity)?;
        Some(EventRecord {
            timestamp: span.opened_at,
            activity: span.activity,
            app: self.app.clone(),
            entity: entity.to_owned(),
            duration_secs: span.accumulated_secs,
            project: span.project,
            language: span.language,
            end_timestamp: now,
        })
    }

    /// Build a heartbeat for one observation and update the stored line
    /// count. The previous count defaults to the current one on first
    /// sight of an entity, so the first delta is always zero rather
    /// than a spurious whole-file delta.
    pub fn heartbeat(
        &mut self,
        obs: &Observation,
        is_write: bool,
        now: DateTime<Utc>,
    ) -> HeartbeatRecord {
        let previous = self
            .line_counts
            .get(&obs.entity)
            .copied()
            .unwrap_or(obs.line_count);
        self.line_counts.insert(obs.entity.clone(), obs.line_count);

        HeartbeatRecord {
            project: obs.project.clone(),
            timestamp: now,
            entity: obs.entity.clone(),
            language: obs.language.clone(),
            app: self.app.clone(),
            lines: (obs.line_count - previous).abs(),
            cursorpos: obs.cursorpos,
            is_write,
        }
    }

    /// Close every open span. The periodic scheduler calls this on each
    /// tick with no per-entity idle check; after it returns the table
    /// holds zero open spans.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Vec<EventRecord> {
        let entities: Vec<String> = self.spans.keys().cloned().collect();
        entities
            .into_iter()
            .filter_map(|entity| self.close_span(&entity, now))
            .collect()
    }

    /// Number of currently-open spans.
    pub fn open_spans(&self) -> usize {
        self.spans.len()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid datetime")
    }

    fn obs(entity: &str, line_count: i64) -> Observation {
        Observation {
            entity: entity.to_owned(),
            language: "rust".to_owned(),
            project: "/work/proj".to_owned(),
            line_count,
            cursorpos: 4,
        }
    }

    fn agg() -> Aggregator {
        Aggregator::new("codetrail", t0())
    }

    // ── 1. First observation opens a span at zero ───────────────────

    #[test]
    fn first_observation_opens_span() {
        let mut a = agg();
        let out = a.record(&obs("a.rs", 100), "coding", t0());

        assert_eq!(out.action, SpanAction::Opened);
        assert!(out.closed.is_none());
        assert_eq!(out.span_secs, 0);
        assert_eq!(a.open_spans(), 1);
    }

    // ── 2. Same-activity observations accumulate clock deltas ──────

    #[test]
    fn same_activity_accumulates_deltas() {
        let mut a = agg();
        let o = obs("a.rs", 100);

        a.record(&o, "coding", t0());
        let out = a.record(&o, "coding", t0() + TimeDelta::seconds(10));
        assert_eq!(out.action, SpanAction::Extended);
        assert_eq!(out.span_secs, 10);

        let out = a.record(&o, "coding", t0() + TimeDelta::seconds(25));
        assert_eq!(out.span_secs, 25);
    }

    // ── 3. Duration is measured against the GLOBAL cursor ──────────

    #[test]
    fn duration_uses_global_cursor_not_per_entity() {
        let mut a = agg();

        a.record(&obs("a.rs", 100), "coding", t0());
        // Unrelated entity advances the global cursor to t0+20.
        a.record(&obs("b.rs", 50), "coding", t0() + TimeDelta::seconds(20));
        // a.rs extends at t0+30: credited 30-20=10, not 30.
        let out = a.record(&obs("a.rs", 100), "coding", t0() + TimeDelta::seconds(30));

        assert_eq!(out.action, SpanAction::Extended);
        assert_eq!(out.span_secs, 10);
    }

    // ── 4. Activity change closes the old span, opens at zero ──────

    #[test]
    fn activity_change_closes_and_reopens() {
        let mut a = agg();
        let o = obs("a.rs", 100);

        a.record(&o, "coding", t0());
        a.record(&o, "coding", t0() + TimeDelta::seconds(30));
        let out = a.record(&o, "debugging", t0() + TimeDelta::seconds(30));

        assert_eq!(out.action, SpanAction::Restarted);
        let closed = out.closed.expect("closing record for old span");
        assert_eq!(closed.activity, "coding");
        assert_eq!(closed.duration_secs, 30);
        assert_eq!(closed.timestamp, t0());
        assert_eq!(closed.end_timestamp, t0() + TimeDelta::seconds(30));
        assert_eq!(out.span_secs, 0);

        // The new span is live and extends normally.
        let out = a.record(&o, "debugging", t0() + TimeDelta::seconds(40));
        assert_eq!(out.action, SpanAction::Extended);
        assert_eq!(out.span_secs, 10);
    }

    // ── 5. Every observation emits one heartbeat ────────────────────

    #[test]
    fn record_emits_heartbeat_with_write_flag_clear() {
        let mut a = agg();
        let out = a.record(&obs("a.rs", 100), "coding", t0());

        assert_eq!(out.heartbeat.entity, "a.rs");
        assert_eq!(out.heartbeat.app, "codetrail");
        assert!(!out.heartbeat.is_write);
        assert_eq!(out.heartbeat.timestamp, t0());
    }

    // ── 6. First heartbeat delta is zero ────────────────────────────

    #[test]
    fn first_heartbeat_delta_is_zero() {
        let mut a = agg();
        let hb = a.heartbeat(&obs("a.rs", 4321), false, t0());
        assert_eq!(hb.lines, 0);
    }

    // ── 7. Subsequent heartbeat delta is abs(new - last) ────────────

    #[test]
    fn heartbeat_delta_is_absolute() {
        let mut a = agg();
        a.heartbeat(&obs("a.rs", 100), false, t0());

        let hb = a.heartbeat(&obs("a.rs", 130), false, t0() + TimeDelta::seconds(5));
        assert_eq!(hb.lines, 30);

        // Shrinking the file still reports a positive delta.
        let hb = a.heartbeat(&obs("a.rs", 90), true, t0() + TimeDelta::seconds(9));
        assert_eq!(hb.lines, 40);
        assert!(hb.is_write);
    }

    // ── 8. Stored line count updates unconditionally ────────────────

    #[test]
    fn line_count_updates_every_heartbeat() {
        let mut a = agg();
        a.heartbeat(&obs("a.rs", 100), false, t0());
        a.heartbeat(&obs("a.rs", 150), false, t0());
        // Next delta measures against 150, not 100.
        let hb = a.heartbeat(&obs("a.rs", 160), false, t0());
        assert_eq!(hb.lines, 10);
    }

    // ── 9. Line counts are tracked per entity ───────────────────────

    #[test]
    fn line_counts_independent_per_entity() {
        let mut a = agg();
        a.heartbeat(&obs("a.rs", 100), false, t0());
        let hb = a.heartbeat(&obs("b.rs", 7), false, t0());
        assert_eq!(hb.lines, 0);
    }

    // ── 10. Flush closes everything, however fresh ──────────────────

    #[test]
    fn flush_closes_all_spans() {
        let mut a = agg();
        a.record(&obs("a.rs", 100), "coding", t0());
        a.record(&obs("b.rs", 50), "debugging", t0() + TimeDelta::seconds(1));

        let records = a.flush(t0() + TimeDelta::seconds(2));
        assert_eq!(records.len(), 2);
        assert_eq!(a.open_spans(), 0);

        // A second flush with nothing open produces nothing.
        assert!(a.flush(t0() + TimeDelta::seconds(3)).is_empty());
    }

    // ── 11. Activity after a flush opens a fresh zero-length span ──

    #[test]
    fn activity_after_flush_reopens_at_zero() {
        let mut a = agg();
        let o = obs("a.rs", 100);

        a.record(&o, "coding", t0());
        a.record(&o, "coding", t0() + TimeDelta::seconds(30));
        a.flush(t0() + TimeDelta::seconds(60));

        let out = a.record(&o, "coding", t0() + TimeDelta::seconds(70));
        assert_eq!(out.action, SpanAction::Opened);
        assert_eq!(out.span_secs, 0);
    }

    // ── 12. close_span is a no-op without an open span ──────────────

    #[test]
    fn close_span_without_span_is_noop() {
        let mut a = agg();
        assert!(a.close_span("a.rs", t0()).is_none());
    }

    // ── 13. Record fields come from span-open time ──────────────────

    #[test]
    fn event_record_captures_open_time_context() {
        let mut a = agg();
        let mut o = obs("a.rs", 100);
        a.record(&o, "coding", t0());

        // Language changes mid-span; the closing record keeps the value
        // captured when the span opened.
        o.language = "toml".to_owned();
        a.record(&o, "coding", t0() + TimeDelta::seconds(5));

        let rec = a.close_span("a.rs", t0() + TimeDelta::seconds(8)).expect("open span");
        assert_eq!(rec.language, "rust");
        assert_eq!(rec.project, "/work/proj");
        assert_eq!(rec.app, "codetrail");
        assert_eq!(rec.duration_secs, 5);
    }

    // ── 14. Spec scenario: 0/10/25 then switch at 30, sweep at 60 ──

    #[test]
    fn scripted_session_matches_expected_reports() {
        let mut a = agg();
        let o = obs("a.rs", 100);

        a.record(&o, "coding", t0());
        a.record(&o, "coding", t0() + TimeDelta::seconds(10));
        let out = a.record(&o, "coding", t0() + TimeDelta::seconds(25));
        assert_eq!(out.span_secs, 25);
        a.record(&o, "coding", t0() + TimeDelta::seconds(30));

        // The switch itself closes with the accumulated 30s; the closing
        // observation credits nothing to the old span.
        let out = a.record(&o, "debugging", t0() + TimeDelta::seconds(30));
        let closed = out.closed.expect("coding span closed");
        assert_eq!(closed.duration_secs, 30);
        assert_eq!(closed.activity, "coding");

        a.record(&o, "debugging", t0() + TimeDelta::seconds(60));
        let records = a.flush(t0() + TimeDelta::seconds(60));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].activity, "debugging");
        assert_eq!(records[0].duration_secs, 30);
        assert_eq!(a.open_spans(), 0);
    }
}
