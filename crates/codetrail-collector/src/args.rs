//! Record → collector argv encoding.
//!
//! The collector speaks a flat flag protocol: one `event` or `heartbeat`
//! subcommand followed by key/value pairs. Timestamps are unix seconds;
//! `--is-write` is a bare flag present only when set.

use codetrail_core::{ENTITY_TYPE_FILE, EventRecord, HeartbeatRecord};

/// Encode a closed-span event record.
pub fn event_args(record: &EventRecord) -> Vec<String> {
    vec![
        "event".to_owned(),
        "--timestamp".to_owned(),
        record.timestamp.timestamp().to_string(),
        "--activity-type".to_owned(),
        record.activity.clone(),
        "--app".to_owned(),
        record.app.clone(),
        "--entity".to_owned(),
        record.entity.clone(),
        "--entity-type".to_owned(),
        ENTITY_TYPE_FILE.to_owned(),
        "--duration".to_owned(),
        record.duration_secs.to_string(),
        "--project".to_owned(),
        record.project.clone(),
        "--language".to_owned(),
        record.language.clone(),
        "--end-timestamp".to_owned(),
        record.end_timestamp.timestamp().to_string(),
    ]
}

/// Encode a heartbeat record.
pub fn heartbeat_args(record: &HeartbeatRecord) -> Vec<String> {
    let mut args = vec![
        "heartbeat".to_owned(),
        "--project".to_owned(),
        record.project.clone(),
        "--timestamp".to_owned(),
        record.timestamp.timestamp().to_string(),
        "--entity".to_owned(),
        record.entity.clone(),
        "--entity-type".to_owned(),
        ENTITY_TYPE_FILE.to_owned(),
        "--language".to_owned(),
        record.language.clone(),
        "--app".to_owned(),
        record.app.clone(),
        "--lines".to_owned(),
        record.lines.to_string(),
        "--cursorpos".to_owned(),
        record.cursorpos.to_string(),
    ];
    if record.is_write {
        args.push("--is-write".to_owned());
    }
    args
}
