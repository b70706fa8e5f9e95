// Embeddings module
// Text chunking and the Gemini embedding client

pub mod chunking;
pub mod gemini;

pub use chunking::{Chunk, ChunkingConfig, build_corpus, chunk_corpus, split_text};
pub use gemini::GeminiEmbedder;

use crate::Result;

/// Turns text into fixed-length vectors
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; output order matches input order one-to-one
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;
}
