// Prompt assembly and answer rendering

use itertools::Itertools;
use pulldown_cmark::{Event, Options, Parser, html};

use super::memory::Message;

/// Instructions that open every prompt
pub const PERSONA: &str = "You are Guruji, a friendly and wise Machine Learning teacher. \
Only answer questions related to Machine Learning, AI, Deep Learning, or Data Science. \
Explain concepts clearly, step by step, as if teaching a student. \
Respond in simple and understandable language. \
Use bullets, bold, and no emojis where appropriate. \
Do not output raw markdown.";

const CLOSING_LINE: &str = "Answer as a teacher to a student.";

/// Persona, retrieved context, conversation so far and the question, in that order
#[inline]
pub fn build_prompt(context: &[String], history: &[Message], question: &str) -> String {
    let context_text = context.join("\n\n");
    let memory_text = history
        .iter()
        .map(|message| format!("{}: {}", message.role, message.content))
        .join("\n");

    format!(
        "{PERSONA}\n\nContext:\n{context_text}\n\nConversation:\n{memory_text}\n\nStudent Question:\n{question}\n\n{CLOSING_LINE}"
    )
}

/// Render a model answer from Markdown to HTML.
///
/// Raw HTML in the answer is emitted as escaped text.
#[inline]
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, parser);
    rendered
}
