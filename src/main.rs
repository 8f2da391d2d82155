//! folio - Read portfolio content from the command line
//!
//! Fetches profile, blog and project content from the portfolio API,
//! caching responses on disk and retrying transient failures.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::app;
use folio::cli::Cli;
use folio::config::Config;

/// Installs a stderr subscriber filtered by `RUST_LOG` (default `folio=info`)
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "folio=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::from_cli(&cli)?;
    let client = config.build_client();

    let output = app::execute(&client, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Error messages already embed their causes
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
