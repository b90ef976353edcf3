//! CLI definition using clap derive.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "codetrail", about = "editor activity telemetry daemon")]
pub struct Cli {
    /// UDS socket path (default: $XDG_RUNTIME_DIR/codetrail/codetraild.sock,
    /// else /tmp/codetrail-$USER/codetraild.sock)
    #[arg(long, short = 's', global = true)]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the daemon (intake server + flush scheduler)
    Daemon(DaemonOpts),
    /// Send one activity observation to a running daemon
    Observe(ObserveOpts),
    /// Send one save heartbeat to a running daemon
    Save(SaveOpts),
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Flush scheduler period in seconds
    #[arg(long, default_value = "60")]
    pub flush_interval_secs: u64,

    /// Collector command to invoke for events and heartbeats
    #[arg(long, default_value = "codetrail-cli")]
    pub collector_bin: String,

    /// Application tag stamped on every record
    #[arg(long, default_value = "codetrail")]
    pub app: String,
}

#[derive(clap::Args)]
pub struct ObserveOpts {
    /// File being edited
    #[arg(long)]
    pub entity: String,

    /// Activity category (e.g. coding, debugging)
    #[arg(long)]
    pub activity: String,

    /// Language id of the file
    #[arg(long, default_value = "unknown")]
    pub language: String,

    /// Workspace root path
    #[arg(long, default_value = "unknown")]
    pub project: String,

    /// Current line count of the file
    #[arg(long, default_value = "0")]
    pub line_count: i64,

    /// Cursor offset within the active line
    #[arg(long, default_value = "0")]
    pub cursorpos: i64,
}

#[derive(clap::Args)]
pub struct SaveOpts {
    /// File being saved
    #[arg(long)]
    pub entity: String,

    /// Language id of the file
    #[arg(long, default_value = "unknown")]
    pub language: String,

    /// Workspace root path
    #[arg(long, default_value = "unknown")]
    pub project: String,

    /// Current line count of the file
    #[arg(long, default_value = "0")]
    pub line_count: i64,

    /// Cursor offset within the active line
    #[arg(long, default_value = "0")]
    pub cursorpos: i64,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/codetrail/codetraild.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/codetrail-{user}/codetraild.sock")
}
