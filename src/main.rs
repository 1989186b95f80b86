use std::process::ExitCode;

use clap::Parser;
use gcalendar_core::Settings;
use gcalendar_mcp::{server, setup};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gcalendar-mcp")]
#[command(version)]
#[command(about = "MCP server for Google Calendar")]
struct Cli {
    /// Run the interactive OAuth setup instead of the server
    #[arg(long)]
    setup: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env is fine, the environment may already be set
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    if cli.setup {
        return match setup::run(&settings).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                println!("{}", format!("Setup failed: {:#}", e).red());
                ExitCode::FAILURE
            }
        };
    }

    match server::run(&settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
