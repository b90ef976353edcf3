//! UDS JSON-RPC server: minimal hand-rolled implementation.
//! Connection-per-request, newline-delimited JSON.
//!
//! Intake failures never propagate to the editor beyond a JSON-RPC
//! error response, and never crash the daemon.

use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::Mutex;

use codetrail_collector::CollectorCommandRunner;
use codetrail_core::SpanAction;

use crate::flush_loop::DaemonState;
use crate::intake::{ActivityParams, HeartbeatParams};
use crate::report::{spawn_event_report, spawn_heartbeat_report};

/// Run the UDS JSON-RPC server.
pub async fn run_server<R: CollectorCommandRunner + 'static>(
    socket_path: &str,
    state: Arc<Mutex<DaemonState>>,
    runner: Arc<R>,
) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let state = Arc::clone(&state);
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state, runner).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection<R: CollectorCommandRunner + 'static>(
    stream: tokio::net::UnixStream,
    state: Arc<Mutex<DaemonState>>,
    runner: Arc<R>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    // Unparseable requests still get a response rather than a dropped
    // connection.
    let request: serde_json::Value = match serde_json::from_str(line.trim()) {
        Ok(request) => request,
        Err(e) => {
            let mut resp = serde_json::to_string(&parse_error_response(&e.to_string()))?;
            resp.push('\n');
            writer.write_all(resp.as_bytes()).await?;
            return Ok(());
        }
    };
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();

    let result = match method {
        "log_activity" => handle_log_activity(&request["params"], &state, &runner).await,
        "log_heartbeat" => handle_log_heartbeat(&request["params"], &state, &runner).await,
        _ => Err(format!("method not found: {method}")),
    };

    let response = match result {
        Ok(result) => serde_json::json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": id,
        }),
        Err(message) => serde_json::json!({
            "jsonrpc": "2.0",
            "error": {"code": -32600, "message": message},
            "id": id,
        }),
    };
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    Ok(())
}

/// JSON-RPC parse-error response. The request id is unknowable when the
/// request itself did not parse, so it is null.
fn parse_error_response(detail: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": {"code": -32700, "message": format!("parse error: {detail}")},
        "id": serde_json::Value::Null,
    })
}

/// One activity observation: open/extend/restart the entity's span,
/// then report the closure (if any) and the heartbeat.
async fn handle_log_activity<R: CollectorCommandRunner + 'static>(
    params: &serde_json::Value,
    state: &Arc<Mutex<DaemonState>>,
    runner: &Arc<R>,
) -> Result<serde_json::Value, String> {
    let params: ActivityParams =
        serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {e}"))?;
    let obs = params.observation();

    let outcome = {
        let mut st = state.lock().await;
        st.aggregator.record(&obs, &params.activity, Utc::now())
    };

    tracing::info!(
        "{} span: {} | {} | {} | {}s",
        match outcome.action {
            SpanAction::Opened => "opened",
            SpanAction::Extended => "extended",
            SpanAction::Restarted => "restarted",
        },
        params.activity,
        obs.entity,
        obs.language,
        outcome.span_secs
    );

    if let Some(closed) = outcome.closed {
        spawn_event_report(Arc::clone(runner), closed);
    }
    spawn_heartbeat_report(Arc::clone(runner), outcome.heartbeat);

    Ok(serde_json::json!({"ok": true}))
}

/// The editor's save hook path: heartbeat only, no span change.
async fn handle_log_heartbeat<R: CollectorCommandRunner + 'static>(
    params: &serde_json::Value,
    state: &Arc<Mutex<DaemonState>>,
    runner: &Arc<R>,
) -> Result<serde_json::Value, String> {
    let params: HeartbeatParams =
        serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {e}"))?;
    let obs = params.observation();

    let heartbeat = {
        let mut st = state.lock().await;
        st.aggregator.heartbeat(&obs, params.is_write, Utc::now())
    };

    tracing::info!(
        "{} heartbeat: {} | {} lines",
        if params.is_write { "write" } else { "edit" },
        obs.entity,
        heartbeat.lines
    );

    spawn_heartbeat_report(Arc::clone(runner), heartbeat);

    Ok(serde_json::json!({"ok": true}))
}
