
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::embeddings::gemini::{API_KEY_HEADER, Content, model_url};
use crate::http::HttpClient;
use crate::llm::ChatModel;
use crate::{GurujiError, Result};

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Chat completion client for Gemini `generateContent`
#[derive(Debug, Clone)]
pub struct GeminiChat {
    client: HttpClient,
    api_key: String,
    model: String,
    url: Url,
}

impl GeminiChat {
    #[inline]
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let gemini = &config.gemini;

        Ok(Self {
            client: HttpClient::new(&config.http),
            api_key: gemini.api_key.clone(),
            model: gemini.chat_model.clone(),
            url: model_url(&gemini.base_url, &gemini.chat_model, "generateContent")?,
        })
    }

    #[inline]
    pub fn with_http_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }
}

impl ChatModel for GeminiChat {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting completion from {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let request = GenerateRequest {
            contents: vec![Content::text(Some("user"), prompt)],
        };

        let response: GenerateResponse = self
            .client
            .post_json(
                &self.url,
                &[(API_KEY_HEADER, self.api_key.as_str())],
                &request,
            )
            .map_err(|e| GurujiError::Model(format!("{:#}", e)))?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(GurujiError::Model(format!(
                "{} returned no answer: {}",
                self.model, reason
            )));
        };

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            warn!(
                "Empty completion from {} (finish reason: {})",
                self.model,
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            );
        }

        Ok(text)
    }
}
