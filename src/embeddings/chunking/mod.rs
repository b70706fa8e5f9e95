
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::extractor::Document;

/// A piece of corpus text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Vector store key, freshly generated per chunk
    pub id: Uuid,
    /// Position of this chunk in the corpus
    pub index: usize,
    pub text: String,
}

/// Configuration for recursive text splitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters of the previous chunk repeated at the start of the next one
    pub chunk_overlap: usize,
    /// Boundaries tried in order, coarsest first. An empty string splits
    /// between characters.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
            separators: ["\n\n", "\n", ". ", " ", ""]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Concatenate document texts, each followed by a newline
#[inline]
pub fn build_corpus(documents: &[Document]) -> String {
    let capacity = documents.iter().map(|d| d.text.len() + 1).sum();
    documents
        .iter()
        .fold(String::with_capacity(capacity), |mut corpus, document| {
            corpus.push_str(&document.text);
            corpus.push('\n');
            corpus
        })
}

/// Split the corpus and give every piece an id and position
#[inline]
pub fn chunk_corpus(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = split_text(text, config)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            id: Uuid::new_v4(),
            index,
            text,
        })
        .collect();

    debug!(
        "Split {} characters into {} chunks",
        text.chars().count(),
        chunks.len()
    );

    chunks
}

/// Split text into overlapping chunks of at most `chunk_size` characters.
///
/// The first separator present in the text is used to cut it; pieces are then
/// merged greedily and pieces that are still too long are split again with the
/// remaining separators. A piece with no separator left is kept whole even if
/// it exceeds `chunk_size`.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let separators: Vec<&str> = config.separators.iter().map(String::as_str).collect();
    split_recursive(text, &separators, config)
}

fn split_recursive(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let mut separator = separators.last().copied().unwrap_or("");
    let mut remaining: &[&str] = &[];

    for (position, &candidate) in separators.iter().enumerate() {
        if candidate.is_empty() {
            separator = candidate;
            break;
        }
        if text.contains(candidate) {
            separator = candidate;
            remaining = &separators[position + 1..];
            break;
        }
    }

    let mut chunks = Vec::new();
    let mut pending = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if piece.chars().count() < config.chunk_size {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_splits(&pending, config));
            pending.clear();
        }

        if remaining.is_empty() {
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        } else {
            chunks.extend(split_recursive(piece, remaining, config));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_splits(&pending, config));
    }

    chunks
}

/// Cut `text` at every occurrence of `separator`, which stays at the start of
/// the piece that follows it. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(start, c)| &text[start..start + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (position, _) in text.match_indices(separator) {
        if position > start {
            pieces.push(&text[start..position]);
        }
        start = position;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// Greedily pack small pieces into chunks, carrying trailing pieces of each
/// emitted chunk into the next one while they fit in `chunk_overlap`.
fn merge_splits(splits: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0;

    for &split in splits {
        let len = split.chars().count();

        if total + len > config.chunk_size && !window.is_empty() {
            if total > config.chunk_size {
                warn!(
                    "Created a chunk of size {}, which is longer than the specified {}",
                    total, config.chunk_size
                );
            }

            if let Some(chunk) = join_window(&window) {
                chunks.push(chunk);
            }

            while total > config.chunk_overlap || (total + len > config.chunk_size && total > 0) {
                match window.pop_front() {
                    Some((_, popped)) => total -= popped,
                    None => break,
                }
            }
        }

        window.push_back((split, len));
        total += len;
    }

    if let Some(chunk) = join_window(&window) {
        chunks.push(chunk);
    }

    chunks
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
