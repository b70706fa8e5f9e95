#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! Ingestion pipeline over real files with stubbed embedding and storage

mod common;

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use common::{MemoryIndex, StubEmbedder};
use guruji::embeddings::ChunkingConfig;
use guruji::extractor::extract_documents;
use guruji::indexer::{IngestOutcome, Ingestor};
use guruji::tutor::{Retriever, VectorRetriever};

const GRADIENT: &str = "Gradient descent minimizes a loss function.";
const OVERFITTING: &str = "Overfitting happens when a model memorizes training data.";
const DROPOUT: &str = "Dropout randomly disables neurons during training.";

#[test]
fn single_text_file_becomes_one_record() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("notes.txt"), GRADIENT).expect("should write notes");

    let report = extract_documents(temp_dir.path());
    let index = MemoryIndex::default();
    let outcome = Ingestor::new(&StubEmbedder, &index, ChunkingConfig::default())
        .ingest(&report)
        .expect("ingest should succeed");

    let IngestOutcome::Uploaded(summary) = &outcome else {
        panic!("expected an upload, got {outcome:?}");
    };
    assert_eq!(summary.chunks, 1);
    assert_eq!(summary.files_processed, 1);
    assert_eq!(
        summary.summary(),
        "Successfully uploaded 1 chunks to Pinecone."
    );

    let records = index.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].metadata.text, GRADIENT);
}

#[test]
fn empty_folder_is_a_clean_exit() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index = MemoryIndex::default();
    let ingestor = Ingestor::new(&StubEmbedder, &index, ChunkingConfig::default());

    let outcome = ingestor
        .ingest(&extract_documents(temp_dir.path()))
        .expect("empty folder should not fail");
    assert_eq!(outcome, IngestOutcome::NothingToUpload);

    fs::write(temp_dir.path().join("blank.txt"), "  \n\n ").expect("should write");
    fs::write(temp_dir.path().join("slides.pptx"), b"binary").expect("should write");
    fs::write(temp_dir.path().join("broken.json"), "{").expect("should write");

    let report = extract_documents(temp_dir.path());
    assert_eq!(report.skipped.len(), 3);
    let outcome = ingestor.ingest(&report).expect("blank corpus should not fail");
    assert_eq!(outcome, IngestOutcome::NothingToUpload);
    assert!(index.records().is_empty());
}

#[test]
fn mixed_formats_are_ingested_in_path_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let root = temp_dir.path();
    fs::create_dir_all(root.join("week2")).expect("should create dir");
    fs::write(root.join("a_intro.txt"), "Machine learning learns from data.")
        .expect("should write");
    fs::write(root.join("week2/metrics.csv"), "metric,value\nrmse,0.3\n").expect("should write");
    fs::write(root.join("week2/topics.json"), r#"{"topic":"svm"}"#).expect("should write");

    let report = extract_documents(root);
    assert_eq!(report.processed(), 3);

    let index = MemoryIndex::default();
    Ingestor::new(&StubEmbedder, &index, ChunkingConfig::default())
        .ingest(&report)
        .expect("ingest should succeed");

    let records = index.records();
    assert_eq!(records.len(), 1);
    let text = &records[0].metadata.text;
    let intro = text.find("Machine learning").expect("intro text");
    let metrics = text.find("rmse").expect("csv text");
    let topics = text.find("\"topic\": \"svm\"").expect("json text");
    assert!(intro < metrics && metrics < topics);
}

#[test]
fn ingested_chunks_are_retrievable() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let root = temp_dir.path();
    fs::write(root.join("1.txt"), GRADIENT).expect("should write");
    fs::write(root.join("2.txt"), OVERFITTING).expect("should write");
    fs::write(root.join("3.txt"), DROPOUT).expect("should write");

    let index = Arc::new(MemoryIndex::default());
    let chunking = ChunkingConfig {
        chunk_size: 60,
        chunk_overlap: 0,
        ..ChunkingConfig::default()
    };
    let outcome = Ingestor::new(&StubEmbedder, index.as_ref(), chunking)
        .ingest(&extract_documents(root))
        .expect("ingest should succeed");
    let IngestOutcome::Uploaded(summary) = outcome else {
        panic!("expected an upload");
    };
    assert_eq!(summary.chunks, 3);

    let retriever = VectorRetriever::new(Arc::new(StubEmbedder), index);
    let texts = retriever
        .retrieve(OVERFITTING, 2)
        .expect("retrieve should succeed");

    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], OVERFITTING);
}
