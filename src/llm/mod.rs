// Language model module
// Chat completion behind a narrow trait so the tutor can run against stubs

pub mod gemini;

pub use gemini::GeminiChat;

use crate::Result;

/// Produces a completion for a single prompt
pub trait ChatModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}
