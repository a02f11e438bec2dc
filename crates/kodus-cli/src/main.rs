mod cli;
mod commands;
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_appender::non_blocking::WorkerGuard;

fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { "info" };

    if let Some(base_dir) = dirs::data_dir().map(|d| d.join("kodus")) {
        let log_dir = base_dir.join("logs");
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let probe_path = log_dir.join(".write-probe");
            let probe_result = std::fs::OpenOptions::new().create(true).write(true).truncate(true).open(&probe_path);

            if probe_result.is_ok() {
                let _ = std::fs::remove_file(&probe_path);
                let file_appender = tracing_appender::rolling::daily(log_dir, "kodus.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                tracing_subscriber::fmt()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(false)
                    .with_level(true)
                    .with_env_filter(level)
                    .init();
                return Some(guard);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_env_filter(level)
        .init();
    None
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error::handle_error(err);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose);

    match cli.command {
        Commands::Kernel => commands::run_kernel().await,
        Commands::Agent { prompt, answer } => commands::run_agent(prompt, answer).await,
        Commands::Review => commands::run_review().await,
    }
}
