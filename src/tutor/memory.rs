// Per-session conversation memory with bounded history and session count

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Guruji,
}

impl Role {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Guruji => "guruji",
        }
    }
}

impl fmt::Display for Role {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[inline]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered messages of one session; the oldest is dropped once full
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl Conversation {
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    #[inline]
    pub fn push(&mut self, message: Message) {
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    #[inline]
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug)]
struct Session {
    conversation: Conversation,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<String, Session>,
    clock: u64,
}

/// Conversations keyed by session id.
///
/// Each conversation keeps at most `max_entries` messages. When a new session
/// would exceed `max_sessions`, the least recently used one is dropped.
#[derive(Debug)]
pub struct ConversationStore {
    sessions: Mutex<Sessions>,
    max_entries: usize,
    max_sessions: usize,
}

impl ConversationStore {
    #[inline]
    pub fn new(max_entries: usize, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            max_entries: max_entries.max(1),
            max_sessions: max_sessions.max(1),
        }
    }

    // Every mutation is a single insert, push or remove, so a poisoned map is still consistent
    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message and return the session history including it
    #[inline]
    pub fn append(&self, session_id: &str, message: Message) -> Vec<Message> {
        let mut sessions = self.lock();
        sessions.clock += 1;
        let now = sessions.clock;

        if !sessions.by_id.contains_key(session_id) && sessions.by_id.len() >= self.max_sessions {
            let oldest = sessions
                .by_id
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                debug!("Evicting least recently used session {}", oldest);
                sessions.by_id.remove(&oldest);
            }
        }

        let max_entries = self.max_entries;
        let session = sessions
            .by_id
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                conversation: Conversation::new(max_entries),
                last_used: now,
            });
        session.last_used = now;
        session.conversation.push(message);

        session.conversation.messages().cloned().collect()
    }

    /// Messages of one session, oldest first
    #[inline]
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.lock()
            .by_id
            .get(session_id)
            .map(|session| session.conversation.messages().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget a session, returning whether it existed
    #[inline]
    pub fn clear(&self, session_id: &str) -> bool {
        self.lock().by_id.remove(session_id).is_some()
    }

    #[inline]
    pub fn session_count(&self) -> usize {
        self.lock().by_id.len()
    }

    #[inline]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
