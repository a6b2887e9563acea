use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

use docqa::catalog;
use docqa::config::{self, Config};
use docqa::context::AppContext;
use docqa::error::ServiceError;
use docqa::ingest::{ingest_batch, ingest_document, IngestRequest};
use docqa::qa::{ask, select_documents, QuestionRequest, SelectionRequest};
use docqa_core::models::Metadata;
use docqa_core::pipeline::NO_RELEVANT_DOCUMENTS;
use docqa_core::store::DocumentFilter;

fn test_config(tmp: &TempDir) -> Config {
    let root = tmp.path();
    let config_path = root.join("docqa.toml");
    fs::write(
        &config_path,
        format!(
            r#"[db]
path = "{}/data/docqa.sqlite"

[chunking]
window_chars = 120
overlap_chars = 24

[embedding]
provider = "hash"
dims = 256

[generation]
provider = "echo"
"#,
            root.display()
        ),
    )
    .unwrap();
    config::load_config(&config_path).unwrap()
}

async fn setup() -> (TempDir, AppContext, String) {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let ctx = AppContext::from_config(&cfg).await.unwrap();
    let user = catalog::create_user(&ctx.pool, "ada", "ada@example.com")
        .await
        .unwrap();
    (tmp, ctx, user.id)
}

fn doc(title: &str, content: &str, user_id: &str) -> IngestRequest {
    IngestRequest {
        title: title.to_string(),
        content: content.to_string(),
        user_id: user_id.to_string(),
        metadata: Metadata::new(),
    }
}

#[tokio::test]
async fn test_repeated_sentences_chunk_count() {
    let (_tmp, ctx, user_id) = setup().await;
    let content = "A sentence. ".repeat(50);
    let (window, overlap) = (120usize, 24usize);

    let outcome = ingest_document(&ctx, &doc("Repetition", &content, &user_id))
        .await
        .unwrap();

    let expected = (content.chars().count() - overlap).div_ceil(window - overlap);
    assert_eq!(outcome.chunks_processed, expected);
    assert_eq!(outcome.vector_ids.len(), expected);

    let summary = catalog::get_document_summary(&ctx.pool, &outcome.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.chunk_count as usize, expected);

    let filter = DocumentFilter::from_ids([outcome.document_id.clone()]).unwrap();
    assert_eq!(ctx.store.count(Some(&filter)).await.unwrap(), expected);

    let texts: Vec<String> = sqlx::query_scalar(
        "SELECT content FROM document_chunks WHERE document_id = ? ORDER BY chunk_index",
    )
    .bind(&outcome.document_id)
    .fetch_all(&ctx.pool)
    .await
    .unwrap();
    for text in &texts[..texts.len() - 1] {
        assert!(text.chars().count() <= window);
    }
}

#[tokio::test]
async fn test_question_on_empty_store() {
    let (_tmp, ctx, _user_id) = setup().await;
    let answer = ask(
        &ctx,
        &QuestionRequest {
            question: "What is in the handbook?".into(),
            document_ids: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(
        serde_json::to_value(&answer).unwrap(),
        json!({"answer": NO_RELEVANT_DOCUMENTS, "sources": []})
    );
}

#[tokio::test]
async fn test_selection_with_missing_id_records_nothing() {
    let (_tmp, ctx, user_id) = setup().await;
    let outcome = ingest_document(&ctx, &doc("Real", "Real content.", &user_id))
        .await
        .unwrap();

    let err = select_documents(
        &ctx,
        &SelectionRequest {
            document_ids: vec![outcome.document_id.clone(), "never-ingested".into()],
            user_id: Some(user_id.clone()),
        },
    )
    .await
    .unwrap_err();

    match &err {
        ServiceError::DocumentsNotFound(missing) => {
            assert_eq!(missing, &vec!["never-ingested".to_string()])
        }
        other => panic!("expected DocumentsNotFound, got {:?}", other),
    }
    assert_eq!(err.to_string(), "Documents not found: never-ingested");
    assert!(catalog::list_selection(&ctx.pool, &user_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_selection_recorded_for_user() {
    let (_tmp, ctx, user_id) = setup().await;
    let a = ingest_document(&ctx, &doc("A", "Alpha.", &user_id)).await.unwrap();
    let b = ingest_document(&ctx, &doc("B", "Beta.", &user_id)).await.unwrap();
    let ids = vec![a.document_id, b.document_id];

    let outcome = select_documents(
        &ctx,
        &SelectionRequest {
            document_ids: ids.clone(),
            user_id: Some(user_id.clone()),
        },
    )
    .await
    .unwrap();
    assert_eq!(outcome.selected_documents, ids);
    assert_eq!(catalog::list_selection(&ctx.pool, &user_id).await.unwrap(), ids);
}

#[tokio::test]
async fn test_identical_content_gets_distinct_ids() {
    let (_tmp, ctx, user_id) = setup().await;
    let first = ingest_document(&ctx, &doc("Same", "Same words.", &user_id))
        .await
        .unwrap();
    let second = ingest_document(&ctx, &doc("Same", "Same words.", &user_id))
        .await
        .unwrap();
    assert_ne!(first.document_id, second.document_id);
}

#[tokio::test]
async fn test_restricted_question_cites_only_selected_documents() {
    let (_tmp, ctx, user_id) = setup().await;
    let crabs = ingest_document(&ctx, &doc("Crabs", "Ferris the crab eats plankton.", &user_id))
        .await
        .unwrap();
    ingest_document(&ctx, &doc("Bread", "Sourdough bread needs a starter.", &user_id))
        .await
        .unwrap();

    let answer = ask(
        &ctx,
        &QuestionRequest {
            question: "What does bread need?".into(),
            document_ids: Some(vec![crabs.document_id.clone()]),
        },
    )
    .await
    .unwrap();

    assert_eq!(answer.answer, "Ferris the crab eats plankton.");
    assert!(!answer.sources.is_empty());
    for source in &answer.sources {
        assert_eq!(source.document_id, Value::from(crabs.document_id.clone()));
        assert_eq!(source.title, json!("Crabs"));
    }
}

#[tokio::test]
async fn test_unrestricted_question_returns_at_most_top_k_sources() {
    let (_tmp, ctx, user_id) = setup().await;
    for i in 0..5 {
        ingest_document(&ctx, &doc(&format!("Doc {}", i), "Rust ownership rules.", &user_id))
            .await
            .unwrap();
    }
    let answer = ask(
        &ctx,
        &QuestionRequest {
            question: "ownership".into(),
            document_ids: Some(vec![]),
        },
    )
    .await
    .unwrap();
    assert_eq!(answer.sources.len(), 3);
    assert_eq!(answer.sources[0].chunk_id, json!(0));
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let (_tmp, ctx, _user_id) = setup().await;
    let err = ask(
        &ctx,
        &QuestionRequest {
            question: "   ".into(),
            document_ids: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));
}

#[tokio::test]
async fn test_unknown_user_stores_nothing() {
    let (_tmp, ctx, _user_id) = setup().await;
    let err = ingest_document(&ctx, &doc("Ghost", "Boo.", "no-such-user"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));
    assert_eq!(ctx.store.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_taken_document_id_conflicts_without_writing_vectors() {
    let (_tmp, ctx, user_id) = setup().await;
    let pinned = |title: &str, content: &str| {
        let mut metadata = Metadata::new();
        metadata.insert("document_id".into(), json!("fixed-id"));
        IngestRequest {
            metadata,
            ..doc(title, content, &user_id)
        }
    };

    ingest_document(&ctx, &pinned("Orig", "Ferris eats plankton."))
        .await
        .unwrap();
    let err = ingest_document(&ctx, &pinned("Rejected", "Secret salary table for Ferris."))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(err.to_string(), "document_id already exists: fixed-id");

    let filter = DocumentFilter::from_ids(["fixed-id"]).unwrap();
    assert_eq!(ctx.store.count(Some(&filter)).await.unwrap(), 1);

    let answer = ask(
        &ctx,
        &QuestionRequest {
            question: "salary Ferris".into(),
            document_ids: Some(vec!["fixed-id".into()]),
        },
    )
    .await
    .unwrap();
    assert_eq!(answer.answer, "Ferris eats plankton.");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].title, json!("Orig"));
}

#[tokio::test]
async fn test_selection_for_unknown_user_is_rejected() {
    let (_tmp, ctx, user_id) = setup().await;
    let outcome = ingest_document(&ctx, &doc("Real", "Real content.", &user_id))
        .await
        .unwrap();

    let err = select_documents(
        &ctx,
        &SelectionRequest {
            document_ids: vec![outcome.document_id],
            user_id: Some("ghost".into()),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::Invalid(_)));
    assert_eq!(err.to_string(), "unknown user_id: ghost");
    assert!(catalog::list_selection(&ctx.pool, "ghost")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_batch_ingestion_stops_at_first_failure() {
    let (_tmp, ctx, user_id) = setup().await;
    let ok = ingest_batch(
        &ctx,
        &[doc("One", "First.", &user_id), doc("Two", "Second.", &user_id)],
    )
    .await
    .unwrap();
    assert_eq!(ok.len(), 2);

    let err = ingest_batch(
        &ctx,
        &[
            doc("Three", "Third.", &user_id),
            doc("Bad", "", &user_id),
            doc("Four", "Fourth.", &user_id),
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));
    // "Three" went in before the failure; "Four" never ran.
    assert_eq!(ctx.store.count(None).await.unwrap(), 3);
}
