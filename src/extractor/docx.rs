// Paragraph text from the main part of a Word document

use anyhow::{Context, Result};
use fancy_regex::{Captures, Regex};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

const DOCUMENT_PART: &str = "word/document.xml";

static PARAGRAPH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>(.*?)</w:p>").expect("valid regex")
});

// Bare <w:tab/> only: tab stops in paragraph properties carry attributes
static RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:(tab|br|cr)/>").expect("valid regex")
});

static ENTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|lt|gt|amp|quot|apos);").expect("valid regex")
});

pub(super) fn extract_docx(path: &Path) -> Result<String> {
    let file = File::open(path).context("Failed to open document")?;
    let mut archive = zip::ZipArchive::new(file).context("Not a valid docx archive")?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .with_context(|| format!("Missing {}", DOCUMENT_PART))?
        .read_to_string(&mut xml)
        .with_context(|| format!("Failed to read {}", DOCUMENT_PART))?;

    document_text(&xml)
}

/// Paragraph texts joined by newlines, empty paragraphs included
pub(super) fn document_text(xml: &str) -> Result<String> {
    let mut paragraphs = Vec::new();

    for captures in PARAGRAPH_REGEX.captures_iter(xml) {
        let captures = captures.context("Failed to scan paragraphs")?;
        let body = captures.get(1).map_or("", |m| m.as_str());
        paragraphs.push(paragraph_text(body)?);
    }

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(body: &str) -> Result<String> {
    let mut text = String::new();

    for captures in RUN_REGEX.captures_iter(body) {
        let captures = captures.context("Failed to scan runs")?;
        if let Some(run) = captures.get(1) {
            text.push_str(&unescape_xml(run.as_str()));
            continue;
        }
        match captures.get(2).map(|m| m.as_str()) {
            Some("tab") => text.push('\t'),
            Some(_) => text.push('\n'),
            None => {}
        }
    }

    Ok(text)
}

fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    ENTITY_REGEX
        .replace_all(text, |captures: &Captures<'_>| {
            let entity = captures.get(1).map_or("", |m| m.as_str());
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(|code| code.ok())
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(
                || captures.get(0).map_or("", |m| m.as_str()).to_string(),
                |c| c.to_string(),
            )
        })
        .into_owned()
}
