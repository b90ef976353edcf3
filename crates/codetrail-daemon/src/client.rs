//! UDS JSON-RPC client for CLI subcommands.
//!
//! Editors without a persistent connection integrate by spawning
//! `codetrail observe` / `codetrail save` per callback.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::cli::{ObserveOpts, SaveOpts};

async fn rpc_call(
    socket_path: &str,
    method: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))?;

    let (reader, mut writer) = stream.into_split();

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;
    writer.shutdown().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: serde_json::Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        anyhow::bail!("RPC error: {error}");
    }

    Ok(response["result"].clone())
}

/// `codetrail observe` — forward one activity observation.
pub async fn cmd_observe(socket_path: &str, opts: ObserveOpts) -> anyhow::Result<()> {
    rpc_call(
        socket_path,
        "log_activity",
        serde_json::json!({
            "entity": opts.entity,
            "activity": opts.activity,
            "language": opts.language,
            "project": opts.project,
            "line_count": opts.line_count,
            "cursorpos": opts.cursorpos,
        }),
    )
    .await?;
    Ok(())
}

/// `codetrail save` — forward one write heartbeat.
pub async fn cmd_save(socket_path: &str, opts: SaveOpts) -> anyhow::Result<()> {
    rpc_call(
        socket_path,
        "log_heartbeat",
        serde_json::json!({
            "entity": opts.entity,
            "language": opts.language,
            "project": opts.project,
            "line_count": opts.line_count,
            "cursorpos": opts.cursorpos,
            "is_write": true,
        }),
    )
    .await?;
    Ok(())
}
