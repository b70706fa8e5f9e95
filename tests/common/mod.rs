//! Shared stubs for the integration tests: a deterministic bag-of-words
//! embedder, an in-memory vector index and an echoing chat model

#![allow(dead_code, reason = "each integration test binary uses a different subset")]

use std::sync::Mutex;

use guruji::Result;
use guruji::database::{QueryMatch, VectorIndex, VectorRecord};
use guruji::embeddings::Embedder;
use guruji::llm::ChatModel;

pub const STUB_DIMENSION: usize = 256;

/// Hashes lowercase words into buckets, so equal texts embed identically
pub struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; STUB_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
                    (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
                });
            vector[(hash % STUB_DIMENSION as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        STUB_DIMENSION
    }
}

/// Brute-force cosine similarity over everything upserted
#[derive(Default)]
pub struct MemoryIndex {
    records: Mutex<Vec<VectorRecord>>,
}

impl MemoryIndex {
    pub fn records(&self) -> Vec<VectorRecord> {
        self.records
            .lock()
            .expect("lock should not be poisoned")
            .clone()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl VectorIndex for MemoryIndex {
    fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut stored = self.records.lock().expect("lock should not be poisoned");
        for record in records {
            stored.retain(|existing| existing.id != record.id);
            stored.push(record.clone());
        }
        Ok(records.len())
    }

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let stored = self.records.lock().expect("lock should not be poisoned");
        let mut matches: Vec<QueryMatch> = stored
            .iter()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine(vector, &record.values),
                metadata: Some(record.metadata.clone()),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }
}

/// Answers with the question it was asked, in bold markdown
#[derive(Default)]
pub struct EchoModel {
    prompts: Mutex<Vec<String>>,
}

impl EchoModel {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .clone()
    }
}

impl ChatModel for EchoModel {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .push(prompt.to_string());

        let question = prompt
            .split("Student Question:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\n").next())
            .unwrap_or_default();
        Ok(format!("**Echo:** {question}\n"))
    }
}

pub struct FailingModel;

impl ChatModel for FailingModel {
    fn complete(&self, _prompt: &str) -> Result<String> {
        Err(guruji::GurujiError::Model(
            "HTTP 429 from generateContent".to_string(),
        ))
    }
}
