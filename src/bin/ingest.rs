use anyhow::Result;
use clap::Parser;
use guruji::commands::run_ingest;
use guruji::config::{Config, load_environment};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guruji-ingest")]
#[command(about = "Extract, chunk and embed a folder of documents into the Pinecone index")]
#[command(version)]
struct Cli {
    /// Folder to ingest, overriding DATA_FOLDER
    #[arg(long)]
    data_folder: Option<PathBuf>,
    /// Optional TOML settings file, overriding GURUJI_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    load_environment();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_folder) = cli.data_folder {
        config.data_folder = data_folder;
    }

    run_ingest(&config)?;
    Ok(())
}
