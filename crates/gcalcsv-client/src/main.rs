//! gcalcsv CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use gcalcsv_client::cli::Cli;
use gcalcsv_client::config::{ExportConfig, FileConfig};
use gcalcsv_client::error::{ClientError, ClientResult};
use gcalcsv_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    if let Err(e) = init_tracing(TracingConfig::for_cli(cli.debug)) {
        eprintln!("warning: failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // Load configuration
    let file = if let Some(ref path) = cli.config {
        FileConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        FileConfig::load().map_err(ClientError::Config)?
    };
    let config = ExportConfig::resolve(&cli, &file)?;

    gcalcsv_client::commands::export::run(config).await?;
    Ok(())
}
