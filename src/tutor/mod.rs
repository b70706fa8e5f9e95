// Tutor module
// Retrieval, prompt assembly and per-session memory around the chat model


pub mod memory;
pub mod prompt;

pub use memory::{Conversation, ConversationStore, Message, Role};
pub use prompt::{PERSONA, build_prompt, render_markdown};

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::Result;
use crate::config::TutorConfig;
use crate::database::VectorIndex;
use crate::embeddings::Embedder;
use crate::llm::ChatModel;

/// Finds the chunk texts most relevant to a question
pub trait Retriever: Send + Sync {
    fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<String>>;
}

/// Embeds the question and keeps the text of the top matches
#[derive(Clone)]
pub struct VectorRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl VectorRetriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }
}

impl Retriever for VectorRetriever {
    #[inline]
    fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<String>> {
        let vector = self.embedder.embed(question)?;
        let matches = self.index.query(&vector, top_k)?;

        Ok(matches
            .into_iter()
            .filter_map(|m| m.metadata.map(|metadata| metadata.text))
            .collect())
    }
}

/// A model answer, as plain text and rendered HTML
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub html: String,
}

pub struct Tutor {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn ChatModel>,
    memory: ConversationStore,
    top_k: usize,
}

impl Tutor {
    #[inline]
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn ChatModel>,
        config: &TutorConfig,
    ) -> Self {
        Self {
            retriever,
            model,
            memory: ConversationStore::new(config.memory_entries, config.max_sessions),
            top_k: config.top_k,
        }
    }

    /// Answer a question within one session's conversation.
    ///
    /// The question is recorded before retrieval, so it also appears in the
    /// prompt's conversation section. The answer is recorded only on success.
    #[inline]
    pub fn ask(&self, session_id: &str, question: &str) -> Result<Answer> {
        let history = self
            .memory
            .append(session_id, Message::new(Role::Student, question));

        let context = self.retriever.retrieve(question, self.top_k)?;
        debug!(
            "Retrieved {} context chunks for session {}",
            context.len(),
            session_id
        );

        let prompt = build_prompt(&context, &history, question);
        let answer = self.model.complete(&prompt)?.trim().to_string();

        self.memory
            .append(session_id, Message::new(Role::Guruji, answer.as_str()));
        info!(
            "Answered question in session {} ({} characters)",
            session_id,
            answer.len()
        );

        Ok(Answer {
            html: render_markdown(&answer),
            text: answer,
        })
    }

    #[inline]
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.memory.history(session_id)
    }

    /// Drop a session's memory, returning whether it existed
    #[inline]
    pub fn forget(&self, session_id: &str) -> bool {
        self.memory.clear(session_id)
    }

    #[inline]
    pub fn memory(&self) -> &ConversationStore {
        &self.memory
    }
}
