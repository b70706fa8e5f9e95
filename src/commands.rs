use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::{EnsureOutcome, EnsuredIndex, IndexSpec, PineconeClient};
use crate::embeddings::GeminiEmbedder;
use crate::extractor::extract_documents;
use crate::indexer::{IngestOutcome, Ingestor};
use crate::llm::GeminiChat;
use crate::server::{AppState, router};
use crate::tutor::{Tutor, VectorRetriever};

/// Create the configured index if needed and report which case applied
#[inline]
pub fn prepare_index(config: &Config) -> Result<EnsuredIndex> {
    let client = PineconeClient::new(config)?;
    let ensured = client
        .ensure_index(&IndexSpec::from_config(config))
        .with_context(|| format!("Failed to prepare index {}", config.pinecone.index_name))?;

    match ensured.outcome {
        EnsureOutcome::Created => println!("Created new index: {}", config.pinecone.index_name),
        EnsureOutcome::Existing => {
            println!("Index already exists: {}", config.pinecone.index_name);
        }
    }

    Ok(ensured)
}

/// Extract, chunk, embed and upload every file under the data folder
#[inline]
pub fn run_ingest(config: &Config) -> Result<IngestOutcome> {
    let ensured = prepare_index(config)?;
    let embedder = GeminiEmbedder::new(config)?;

    info!("Reading documents from {}", config.data_folder.display());
    let report = extract_documents(&config.data_folder);
    for path in &report.skipped {
        println!(" No text extracted from {}", path.display());
    }

    let ingestor = Ingestor::new(&embedder, &ensured.index, config.chunking.clone())
        .with_batch_size(config.gemini.batch_size as usize)
        .on_upload(|chunks, files| {
            println!("Generating embeddings for {chunks} chunks from {files} file(s)...");
        });

    let outcome = ingestor
        .ingest(&report)
        .context("Failed to upload chunks")?;
    match &outcome {
        IngestOutcome::NothingToUpload => println!("No text found to upload."),
        IngestOutcome::Uploaded(summary) => println!("{}", summary.summary()),
    }

    Ok(outcome)
}

/// Wire the Gemini and Pinecone services into a tutor
#[inline]
pub fn build_tutor(config: &Config) -> Result<Tutor> {
    let ensured = prepare_index(config)?;
    let embedder = GeminiEmbedder::new(config)?;
    let model = GeminiChat::new(config)?;

    let retriever = VectorRetriever::new(Arc::new(embedder), Arc::new(ensured.index));
    Ok(Tutor::new(
        Arc::new(retriever),
        Arc::new(model),
        &config.tutor,
    ))
}

/// Run the HTTP server until interrupted
#[inline]
pub async fn serve(config: Config) -> Result<()> {
    let address = config.server.socket_addr()?;
    let tutor = tokio::task::spawn_blocking(move || build_tutor(&config))
        .await
        .context("Tutor setup task failed")??;

    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Guruji listening on http://{}", address);
    println!("Guruji is ready at http://{}", address);

    axum::serve(listener, router(AppState::new(tutor)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
