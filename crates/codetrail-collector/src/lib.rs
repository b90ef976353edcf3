//! codetrail-collector: invocation of the external collector command.
//!
//! The aggregation core produces records; this crate turns them into the
//! collector's argv shape and runs the collector binary as a subprocess.
//! The runner is a trait so the daemon's tests inject a mock instead of
//! spawning processes.

pub mod args;
pub mod error;
pub mod executor;

pub use args::{event_args, heartbeat_args};
pub use error::CollectorError;
pub use executor::{CollectorCommandRunner, CollectorExecutor};
