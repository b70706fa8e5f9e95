// Indexer module
// Turns extracted documents into embedded chunks and writes them to the vector index


use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::database::{VectorIndex, VectorRecord};
use crate::embeddings::{Chunk, ChunkingConfig, Embedder, build_corpus, chunk_corpus};
use crate::extractor::ExtractionReport;
use crate::{GurujiError, Result};

const DEFAULT_EMBED_BATCH_SIZE: usize = 100;

/// Result of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The corpus was blank after extraction
    NothingToUpload,
    Uploaded(IngestReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub chunks: usize,
    /// Records acknowledged by the vector index
    pub uploaded: usize,
}

impl IngestReport {
    #[inline]
    pub fn summary(&self) -> String {
        format!("Successfully uploaded {} chunks to Pinecone.", self.uploaded)
    }
}

/// Called with the chunk and file counts just before embedding starts
type UploadNotice<'a> = Box<dyn Fn(usize, usize) + 'a>;

/// Chunks, embeds and upserts a corpus
pub struct Ingestor<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    chunking: ChunkingConfig,
    batch_size: usize,
    on_upload: Option<UploadNotice<'a>>,
}

impl<'a> Ingestor<'a> {
    #[inline]
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            chunking,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
            on_upload: None,
        }
    }

    /// Number of chunks sent to the embedder per call
    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn on_upload(mut self, notice: impl Fn(usize, usize) + 'a) -> Self {
        self.on_upload = Some(Box::new(notice));
        self
    }

    /// Split the extracted corpus; empty when there is no text at all
    #[inline]
    pub fn chunk(&self, report: &ExtractionReport) -> Vec<Chunk> {
        let corpus = build_corpus(&report.documents);
        if corpus.trim().is_empty() {
            return Vec::new();
        }
        chunk_corpus(&corpus, &self.chunking)
    }

    /// Embed every chunk in order, showing progress on a terminal
    #[inline]
    pub fn embed(&self, chunks: &[Chunk]) -> Result<Vec<VectorRecord>> {
        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;

            if vectors.len() != batch.len() {
                bar.abandon();
                return Err(GurujiError::Embedding(format!(
                    "Embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            records.extend(
                batch
                    .iter()
                    .zip(vectors)
                    .map(|(chunk, values)| VectorRecord::from_chunk(chunk, values)),
            );
            bar.inc(batch.len() as u64);
        }

        bar.finish_and_clear();
        debug!("Embedded {} chunks", records.len());
        Ok(records)
    }

    /// Embed and upsert chunks, returning the count the index accepted
    #[inline]
    pub fn upload(&self, chunks: &[Chunk]) -> Result<usize> {
        let records = self.embed(chunks)?;
        let uploaded = self.index.upsert(&records)?;
        info!("Uploaded {} of {} records", uploaded, records.len());
        Ok(uploaded)
    }

    /// Run the whole pipeline over an extraction report
    #[inline]
    pub fn ingest(&self, report: &ExtractionReport) -> Result<IngestOutcome> {
        let chunks = self.chunk(report);
        if chunks.is_empty() {
            info!("No text found to upload");
            return Ok(IngestOutcome::NothingToUpload);
        }

        info!(
            "Generating embeddings for {} chunks from {} file(s)",
            chunks.len(),
            report.processed()
        );
        if let Some(notice) = &self.on_upload {
            notice(chunks.len(), report.processed());
        }
        let uploaded = self.upload(&chunks)?;
        if uploaded != chunks.len() {
            warn!("Index acknowledged {} of {} chunks", uploaded, chunks.len());
        }

        Ok(IngestOutcome::Uploaded(IngestReport {
            files_processed: report.processed(),
            files_skipped: report.skipped.len(),
            chunks: chunks.len(),
            uploaded,
        }))
    }
}
