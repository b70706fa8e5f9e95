// Vector database module
// Records stored in the external vector index and the Pinecone REST client

pub mod pinecone;

pub use pinecone::{
    EnsureOutcome, EnsuredIndex, IndexDescription, IndexSpec, PineconeClient, PineconeIndex,
};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::embeddings::Chunk;

/// Vector stored in the index, keyed by the chunk id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Metadata stored alongside each vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChunkMetadata {
    /// The chunk text returned to the tutor at query time
    #[serde(default)]
    pub text: String,
}

/// One similarity search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<ChunkMetadata>,
}

impl VectorRecord {
    #[inline]
    pub fn from_chunk(chunk: &Chunk, values: Vec<f32>) -> Self {
        Self {
            id: chunk.id.to_string(),
            values,
            metadata: ChunkMetadata {
                text: chunk.text.clone(),
            },
        }
    }
}

/// Storage and top-k similarity search over vector records
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records, returning how many the store accepted
    fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Most similar records first
    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>>;
}
