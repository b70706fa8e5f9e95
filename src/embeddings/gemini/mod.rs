
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::embeddings::Embedder;
use crate::http::HttpClient;
use crate::{GurujiError, Result};

pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

/// Sent for ingested chunks and questions alike
const EMBED_TASK_TYPE: &str = "RETRIEVAL_QUERY";

/// Message content as the Gemini REST API expects it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Part {
    #[serde(default)]
    pub text: String,
}

impl Content {
    pub(crate) fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

/// `{base}/v1beta/models/{model}:{method}`
pub(crate) fn model_url(base_url: &str, model: &str, method: &str) -> anyhow::Result<Url> {
    let raw = format!(
        "{}/v1beta/models/{}:{}",
        base_url.trim_end_matches('/'),
        model,
        method
    );
    Url::parse(&raw).with_context(|| format!("Failed to build Gemini URL: {}", raw))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: Content,
    task_type: &'static str,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

/// Embedding client for Google's `text-embedding-*` models
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    client: HttpClient,
    api_key: String,
    model: String,
    embed_url: Url,
    batch_url: Url,
    dimension: usize,
    batch_size: usize,
}

impl GeminiEmbedder {
    #[inline]
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let gemini = &config.gemini;

        Ok(Self {
            client: HttpClient::new(&config.http),
            api_key: gemini.api_key.clone(),
            model: gemini.embedding_model.clone(),
            embed_url: model_url(&gemini.base_url, &gemini.embedding_model, "embedContent")?,
            batch_url: model_url(
                &gemini.base_url,
                &gemini.embedding_model,
                "batchEmbedContents",
            )?,
            dimension: gemini.embedding_dimension as usize,
            batch_size: gemini.batch_size.max(1) as usize,
        })
    }

    #[inline]
    pub fn with_http_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    fn request_for(&self, text: &str) -> EmbedRequest {
        EmbedRequest {
            model: format!("models/{}", self.model),
            content: Content::text(None, text),
            task_type: EMBED_TASK_TYPE,
            output_dimensionality: self.dimension,
        }
    }

    fn check_dimension(&self, values: Vec<f32>) -> Result<Vec<f32>> {
        if values.len() != self.dimension {
            return Err(GurujiError::Embedding(format!(
                "Expected {} dimensions from {}, got {}",
                self.dimension,
                self.model,
                values.len()
            )));
        }
        Ok(values)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let [text] = texts {
            return Ok(vec![self.embed(text)?]);
        }

        let request = BatchEmbedRequest {
            requests: texts.iter().map(|text| self.request_for(text)).collect(),
        };

        let response: BatchEmbedResponse = self
            .client
            .post_json(&self.batch_url, &[(API_KEY_HEADER, self.api_key.as_str())], &request)
            .map_err(|e| GurujiError::Embedding(format!("{:#}", e)))?;

        if response.embeddings.len() != texts.len() {
            return Err(GurujiError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        response
            .embeddings
            .into_iter()
            .map(|embedding| self.check_dimension(embedding.values))
            .collect()
    }
}

impl Embedder for GeminiEmbedder {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let response: EmbedResponse = self
            .client
            .post_json(
                &self.embed_url,
                &[(API_KEY_HEADER, self.api_key.as_str())],
                &self.request_for(text),
            )
            .map_err(|e| GurujiError::Embedding(format!("{:#}", e)))?;

        self.check_dimension(response.embedding.values)
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_single_batch(batch)?);
        }

        Ok(vectors)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }
}
