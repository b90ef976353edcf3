//! Daemon wiring: shared state, flush scheduler, and lifecycle.
//!
//! The aggregator is the single shared mutable table; the intake server
//! and the flush ticker both mutate it behind one mutex. Collector
//! calls are spawned only after the lock is released.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{Duration, interval};

use codetrail_collector::{CollectorCommandRunner, CollectorExecutor};
use codetrail_core::Aggregator;

use crate::cli::DaemonOpts;
use crate::report::spawn_event_report;
use crate::server;

/// Shared daemon state protected by a mutex.
pub struct DaemonState {
    pub aggregator: Aggregator,
}

impl DaemonState {
    pub fn new(app: &str) -> Self {
        Self {
            aggregator: Aggregator::new(app, Utc::now()),
        }
    }
}

/// Run the daemon: starts flush scheduler and UDS server, waits for
/// shutdown signal, then flushes whatever is still open (best effort;
/// spans lost here are an accepted gap).
pub async fn run_daemon(opts: DaemonOpts, socket_path: &str) -> anyhow::Result<()> {
    let runner = Arc::new(CollectorExecutor::new(&opts.collector_bin));
    let state = Arc::new(Mutex::new(DaemonState::new(&opts.app)));

    // Start UDS intake server
    let server_state = Arc::clone(&state);
    let server_runner = Arc::clone(&runner);
    let server_socket = socket_path.to_string();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, server_state, server_runner).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    // Start flush scheduler
    let flush_state = Arc::clone(&state);
    let flush_runner = Arc::clone(&runner);
    let flush_secs = opts.flush_interval_secs;
    let flush_handle = tokio::spawn(async move {
        run_flush_loop(flush_state, flush_runner, flush_secs).await;
    });

    // Wait for shutdown signal (ctrl-c or SIGTERM)
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    tokio::select! {
        () = shutdown => {}
        _ = flush_handle => {
            tracing::warn!("flush scheduler exited unexpectedly");
        }
        _ = server_handle => {
            tracing::warn!("server exited unexpectedly");
        }
    }

    // Final best-effort flush of open spans.
    flush_tick(&state, &runner).await;

    // Cleanup socket
    let _ = std::fs::remove_file(socket_path);
    tracing::info!("daemon stopped");
    Ok(())
}

async fn run_flush_loop<R: CollectorCommandRunner + 'static>(
    state: Arc<Mutex<DaemonState>>,
    runner: Arc<R>,
    flush_secs: u64,
) {
    let mut ticker = interval(Duration::from_secs(flush_secs));
    // The first tick fires immediately; skip it so the first real sweep
    // happens one full period after startup.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        flush_tick(&state, &runner).await;
    }
}

/// One scheduler sweep: close every open span and report each closure.
/// Records leave the table inside the lock; reports run outside it.
async fn flush_tick<R: CollectorCommandRunner + 'static>(
    state: &Arc<Mutex<DaemonState>>,
    runner: &Arc<R>,
) {
    let records = {
        let mut st = state.lock().await;
        st.aggregator.flush(Utc::now())
    };

    if records.is_empty() {
        return;
    }

    tracing::info!("flush tick: closing {} open span(s)", records.len());
    for record in records {
        spawn_event_report(Arc::clone(runner), record);
    }
}
