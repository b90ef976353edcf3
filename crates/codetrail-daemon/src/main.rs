//! codetrail: editor activity telemetry daemon binary.
//! Single-process binary embedding intake server, aggregation engine,
//! and flush scheduler.

use clap::Parser;

mod cli;
mod client;
mod flush_loop;
mod intake;
mod report;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Daemon(opts) => {
            let filter = std::env::var("CODETRAIL_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("codetrail daemon starting");
            flush_loop::run_daemon(opts, &socket_path).await?;
        }
        cli::Command::Observe(opts) => {
            client::cmd_observe(&socket_path, opts).await?;
        }
        cli::Command::Save(opts) => {
            client::cmd_save(&socket_path, opts).await?;
        }
    }

    Ok(())
}
