//! Wire types for the editor intake protocol.
//!
//! Editors send newline-delimited JSON-RPC over the unix socket; the
//! params decode into these structs. Missing project/language degrade
//! to the "unknown" sentinel and missing counts to zero rather than
//! rejecting the request. Only a missing entity (or activity, for
//! `log_activity`) is a protocol error.

use codetrail_core::{Observation, UNKNOWN};
use serde::Deserialize;

/// Params for the `log_activity` method: one activity observation.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityParams {
    pub entity: String,
    pub activity: String,
    #[serde(flatten)]
    pub context: ObservationContext,
}

/// Params for the `log_heartbeat` method: the editor's save hook path.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatParams {
    pub entity: String,
    #[serde(default)]
    pub is_write: bool,
    #[serde(flatten)]
    pub context: ObservationContext,
}

/// Shared observation context, all best-effort.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationContext {
    #[serde(default = "unknown")]
    pub language: String,
    #[serde(default = "unknown")]
    pub project: String,
    #[serde(default)]
    pub line_count: i64,
    #[serde(default)]
    pub cursorpos: i64,
}

fn unknown() -> String {
    UNKNOWN.to_owned()
}

impl ActivityParams {
    pub fn observation(&self) -> Observation {
        build_observation(&self.entity, &self.context)
    }
}

impl HeartbeatParams {
    pub fn observation(&self) -> Observation {
        build_observation(&self.entity, &self.context)
    }
}

fn build_observation(entity: &str, context: &ObservationContext) -> Observation {
    Observation {
        entity: entity.to_owned(),
        language: context.language.clone(),
        project: context.project.clone(),
        line_count: context.line_count,
        cursorpos: context.cursorpos,
    }
}
