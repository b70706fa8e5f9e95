use anyhow::Result;
use clap::Parser;
use guruji::commands::serve;
use guruji::config::{Config, load_environment};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guruji-server")]
#[command(about = "Answer machine learning questions over HTTP from the ingested corpus")]
#[command(version)]
struct Cli {
    /// Optional TOML settings file, overriding GURUJI_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_environment();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    serve(config).await
}
