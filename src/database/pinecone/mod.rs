#[cfg(test)]
mod tests;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::{QueryMatch, VectorIndex, VectorRecord};
use crate::config::Config;
use crate::http::HttpClient;
use crate::{GurujiError, Result};

const API_KEY_HEADER: &str = "Api-Key";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Parameters of the serverless index the application expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: u32,
    pub metric: String,
    pub cloud: String,
    pub region: String,
}

impl IndexSpec {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.pinecone.index_name.clone(),
            dimension: config.gemini.embedding_dimension,
            metric: config.pinecone.metric.clone(),
            cloud: config.pinecone.cloud.clone(),
            region: config.pinecone.region.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: Option<String>,
}

/// Index as reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub metric: Option<String>,
    /// Data plane host, usually without a scheme
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub status: IndexStatus,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: &'a str,
    spec: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    serverless: CloudRegion<'a>,
}

#[derive(Debug, Serialize)]
struct CloudRegion<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

/// Whether [`PineconeClient::ensure_index`] had to create the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Existing,
}

#[derive(Debug, Clone)]
pub struct EnsuredIndex {
    pub outcome: EnsureOutcome,
    pub description: IndexDescription,
    pub index: PineconeIndex,
}

/// Control plane client: lists, describes and creates indexes
#[derive(Debug, Clone)]
pub struct PineconeClient {
    client: HttpClient,
    api_key: String,
    api_version: String,
    control_url: String,
    upsert_batch_size: usize,
    ready_timeout: Duration,
    poll_interval: Duration,
}

impl PineconeClient {
    #[inline]
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let pinecone = &config.pinecone;
        let control_url = pinecone
            .control_url()
            .context("Invalid Pinecone control URL")?;

        Ok(Self {
            client: HttpClient::new(&config.http),
            api_key: pinecone.api_key.clone(),
            api_version: pinecone.api_version.clone(),
            control_url: control_url.as_str().trim_end_matches('/').to_string(),
            upsert_batch_size: pinecone.upsert_batch_size.max(1) as usize,
            ready_timeout: Duration::from_secs(pinecone.ready_timeout_secs),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    #[inline]
    pub fn with_http_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    #[inline]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [
            (API_KEY_HEADER, self.api_key.as_str()),
            (API_VERSION_HEADER, self.api_version.as_str()),
        ]
    }

    fn control_endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.control_url, path);
        Url::parse(&raw)
            .map_err(|e| GurujiError::VectorStore(format!("Invalid control URL {}: {}", raw, e)))
    }

    #[inline]
    pub fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let url = self.control_endpoint("indexes")?;
        let list: IndexList = self
            .client
            .get_json(&url, &self.headers())
            .map_err(|e| store_error("Failed to list indexes", &e))?;

        debug!("Found {} indexes", list.indexes.len());
        Ok(list.indexes)
    }

    #[inline]
    pub fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let url = self.control_endpoint(&format!("indexes/{}", name))?;
        self.client
            .get_json(&url, &self.headers())
            .map_err(|e| store_error(&format!("Failed to describe index {}", name), &e))
    }

    #[inline]
    pub fn create_index(&self, spec: &IndexSpec) -> Result<IndexDescription> {
        let url = self.control_endpoint("indexes")?;
        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: &spec.metric,
            spec: ServerlessSpec {
                serverless: CloudRegion {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        };

        info!(
            "Creating index {} ({} dimensions, {}, {}/{})",
            spec.name, spec.dimension, spec.metric, spec.cloud, spec.region
        );

        self.client
            .post_json(&url, &self.headers(), &request)
            .map_err(|e| store_error(&format!("Failed to create index {}", spec.name), &e))
    }

    /// Poll the control plane until the index reports ready
    #[inline]
    pub fn wait_until_ready(&self, name: &str) -> Result<IndexDescription> {
        let started = Instant::now();

        loop {
            let description = self.describe_index(name)?;
            if description.status.ready {
                return Ok(description);
            }

            if started.elapsed() >= self.ready_timeout {
                return Err(GurujiError::VectorStore(format!(
                    "Index {} not ready after {:?} (state: {})",
                    name,
                    self.ready_timeout,
                    description.status.state.as_deref().unwrap_or("unknown")
                )));
            }

            debug!("Index {} not ready yet, waiting {:?}", name, self.poll_interval);
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Create the index if it is missing and connect to its data plane.
    ///
    /// An existing index whose dimension differs from `spec.dimension` is an error.
    #[inline]
    pub fn ensure_index(&self, spec: &IndexSpec) -> Result<EnsuredIndex> {
        let existing = self
            .list_indexes()?
            .into_iter()
            .any(|index| index.name == spec.name);

        let (outcome, description) = if existing {
            info!("Index already exists: {}", spec.name);
            (EnsureOutcome::Existing, self.describe_index(&spec.name)?)
        } else {
            self.create_index(spec)?;
            info!("Created new index: {}", spec.name);
            (EnsureOutcome::Created, self.wait_until_ready(&spec.name)?)
        };

        if let Some(dimension) = description.dimension {
            if dimension != spec.dimension {
                return Err(GurujiError::VectorStore(format!(
                    "Index {} has dimension {} but embeddings have {}",
                    spec.name, dimension, spec.dimension
                )));
            }
        }

        let index = self.connect(&description)?;
        Ok(EnsuredIndex {
            outcome,
            description,
            index,
        })
    }

    /// Data plane handle for a described index
    #[inline]
    pub fn connect(&self, description: &IndexDescription) -> Result<PineconeIndex> {
        if description.host.trim().is_empty() {
            return Err(GurujiError::VectorStore(format!(
                "Index {} has no host yet",
                description.name
            )));
        }

        Ok(PineconeIndex {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            api_version: self.api_version.clone(),
            host: data_plane_url(&description.host)?,
            upsert_batch_size: self.upsert_batch_size,
        })
    }
}

/// Data plane client for one index
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    client: HttpClient,
    api_key: String,
    api_version: String,
    host: String,
    upsert_batch_size: usize,
}

impl PineconeIndex {
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.host, path);
        Url::parse(&raw)
            .map_err(|e| GurujiError::VectorStore(format!("Invalid index URL {}: {}", raw, e)))
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [
            (API_KEY_HEADER, self.api_key.as_str()),
            (API_VERSION_HEADER, self.api_version.as_str()),
        ]
    }
}

impl VectorIndex for PineconeIndex {
    #[inline]
    fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let url = self.endpoint("vectors/upsert")?;
        let mut upserted = 0;

        for batch in records.chunks(self.upsert_batch_size) {
            let response: UpsertResponse = self
                .client
                .post_json(&url, &self.headers(), &UpsertRequest { vectors: batch })
                .map_err(|e| store_error("Failed to upsert vectors", &e))?;

            if response.upserted_count != batch.len() {
                warn!(
                    "Pinecone accepted {} of {} vectors",
                    response.upserted_count,
                    batch.len()
                );
            }
            upserted += response.upserted_count;
        }

        debug!("Upserted {} vectors to {}", upserted, self.host);
        Ok(upserted)
    }

    #[inline]
    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let url = self.endpoint("query")?;
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let response: QueryResponse = self
            .client
            .post_json(&url, &self.headers(), &request)
            .map_err(|e| store_error("Failed to query index", &e))?;

        debug!("Query returned {} matches", response.matches.len());
        Ok(response.matches)
    }
}

/// Hosts come back without a scheme; HTTPS is implied
fn data_plane_url(host: &str) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    Url::parse(&raw)
        .map_err(|e| GurujiError::VectorStore(format!("Invalid index host {}: {}", raw, e)))?;
    Ok(raw)
}

fn store_error(message: &str, error: &anyhow::Error) -> GurujiError {
    GurujiError::VectorStore(format!("{}: {:#}", message, error))
}
