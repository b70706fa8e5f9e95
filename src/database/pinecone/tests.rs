use super::*;
use crate::database::ChunkMetadata;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(control_url: &str) -> Config {
    let mut config = Config::default();
    config.gemini.embedding_dimension = 4;
    config.pinecone.api_key = "pc-key".to_string();
    config.pinecone.index_name = "guruji".to_string();
    config.pinecone.control_url = control_url.to_string();
    config
}

fn client(server: &MockServer) -> PineconeClient {
    PineconeClient::new(&test_config(&server.uri()))
        .expect("client should build")
        .with_poll_interval(Duration::ZERO)
}

fn description(server: &MockServer, ready: bool, dimension: u32) -> serde_json::Value {
    json!({
        "name": "guruji",
        "dimension": dimension,
        "metric": "cosine",
        "host": server.uri(),
        "status": {"ready": ready, "state": if ready { "Ready" } else { "Initializing" }}
    })
}

fn record(id: &str, text: &str) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        values: vec![0.5; 4],
        metadata: ChunkMetadata {
            text: text.to_string(),
        },
    }
}

#[test]
fn host_without_scheme_gets_https() {
    assert_eq!(
        data_plane_url("guruji-abc.svc.pinecone.io").expect("valid host"),
        "https://guruji-abc.svc.pinecone.io"
    );
    assert_eq!(
        data_plane_url("http://127.0.0.1:8080/").expect("valid host"),
        "http://127.0.0.1:8080"
    );
}

#[test]
fn index_spec_from_config() {
    let spec = IndexSpec::from_config(&test_config("https://api.pinecone.io"));
    assert_eq!(spec.name, "guruji");
    assert_eq!(spec.dimension, 4);
    assert_eq!(spec.metric, "cosine");
    assert_eq!(spec.cloud, "aws");
    assert_eq!(spec.region, "us-east-1");
}

#[tokio::test]
async fn ensure_creates_missing_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .and(header("Api-Key", "pc-key"))
        .and(header("X-Pinecone-API-Version", "2024-07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"indexes": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(body_json(json!({
            "name": "guruji",
            "dimension": 4,
            "metric": "cosine",
            "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(description(&server, false, 4)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/guruji"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, false, 4)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/guruji"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, true, 4)))
        .mount(&server)
        .await;

    let client = client(&server);
    let spec = IndexSpec::from_config(&test_config(&server.uri()));
    let ensured = client.ensure_index(&spec).expect("index should be created");

    assert_eq!(ensured.outcome, EnsureOutcome::Created);
    assert!(ensured.description.status.ready);
    assert_eq!(ensured.index.host(), server.uri());
}

#[tokio::test]
async fn ensure_reuses_existing_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"indexes": [description(&server, true, 4)]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/guruji"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, true, 4)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let spec = IndexSpec::from_config(&test_config(&server.uri()));
    let ensured = client.ensure_index(&spec).expect("existing index should be reused");

    assert_eq!(ensured.outcome, EnsureOutcome::Existing);
}

#[tokio::test]
async fn ensure_rejects_dimension_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"indexes": [description(&server, true, 1536)]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/guruji"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(description(&server, true, 1536)),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let spec = IndexSpec::from_config(&test_config(&server.uri()));
    let error = client
        .ensure_index(&spec)
        .expect_err("dimension mismatch must fail");

    assert!(matches!(error, GurujiError::VectorStore(_)));
    assert!(error.to_string().contains("1536"));
}

#[tokio::test]
async fn wait_until_ready_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/guruji"))
        .respond_with(ResponseTemplate::new(200).set_body_json(description(&server, false, 4)))
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.pinecone.ready_timeout_secs = 0;
    let client = PineconeClient::new(&config)
        .expect("client should build")
        .with_poll_interval(Duration::ZERO);

    assert!(client.wait_until_ready("guruji").is_err());
}

#[tokio::test]
async fn upsert_sends_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("Api-Key", "pc-key"))
        .and(body_partial_json(json!({
            "vectors": [
                {"id": "a", "metadata": {"text": "alpha"}},
                {"id": "b", "metadata": {"text": "beta"}}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 2})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(body_partial_json(json!({
            "vectors": [{"id": "c", "metadata": {"text": "gamma"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.pinecone.upsert_batch_size = 2;
    let client = PineconeClient::new(&config).expect("client should build");
    let index = client
        .connect(&IndexDescription {
            name: "guruji".to_string(),
            dimension: Some(4),
            metric: None,
            host: server.uri(),
            status: IndexStatus::default(),
        })
        .expect("connect should succeed");

    let records = vec![
        record("a", "alpha"),
        record("b", "beta"),
        record("c", "gamma"),
    ];
    let upserted = index.upsert(&records).expect("upsert should succeed");

    assert_eq!(upserted, 3);
}

#[tokio::test]
async fn query_returns_matches_with_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({
            "vector": [0.25, 0.25, 0.25, 0.25],
            "topK": 3,
            "includeMetadata": true,
            "includeValues": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {"id": "a", "score": 0.92, "metadata": {"text": "Overfitting happens when a model memorizes training data."}},
                {"id": "b", "score": 0.41}
            ],
            "namespace": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let index = client
        .connect(&IndexDescription {
            name: "guruji".to_string(),
            dimension: Some(4),
            metric: None,
            host: server.uri(),
            status: IndexStatus::default(),
        })
        .expect("connect should succeed");

    let matches = index
        .query(&[0.25, 0.25, 0.25, 0.25], 3)
        .expect("query should succeed");

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "a");
    assert_eq!(
        matches[0].metadata.as_ref().map(|m| m.text.as_str()),
        Some("Overfitting happens when a model memorizes training data.")
    );
    assert!(matches[1].metadata.is_none());
}

#[test]
fn connect_requires_host() {
    let client = PineconeClient::new(&test_config("https://api.pinecone.io"))
        .expect("client should build");
    let result = client.connect(&IndexDescription {
        name: "guruji".to_string(),
        dimension: None,
        metric: None,
        host: String::new(),
        status: IndexStatus::default(),
    });

    assert!(result.is_err());
}
