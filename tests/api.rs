use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

use docqa::config::{self, Config};
use docqa::context::AppContext;
use docqa::server;

fn test_config(tmp: &TempDir) -> Config {
    let root = tmp.path();
    let config_path = root.join("docqa.toml");
    fs::write(
        &config_path,
        format!(
            r#"[db]
path = "{}/data/docqa.sqlite"

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

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Start a server on a free port; returns the temp dir guard and base URL.
async fn start_server() -> (TempDir, String, tokio::task::JoinHandle<()>) {
    let tmp = TempDir::new().unwrap();
    let cfg = test_config(&tmp);
    let ctx = AppContext::from_config(&cfg).await.unwrap();
    let port = find_free_port();
    let bind = format!("127.0.0.1:{}", port);

    let handle = tokio::spawn(async move {
        let _ = server::run_server(ctx, &bind).await;
    });
    wait_for_server(port).await;
    (tmp, format!("http://127.0.0.1:{}", port), handle)
}

async fn create_user(client: &reqwest::Client, base: &str, username: &str) -> String {
    let resp = client
        .post(format!("{}/users", base))
        .json(&json!({"username": username, "email": format!("{}@example.com", username)}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["username"], json!(username));
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (_tmp, base, handle) = start_server().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    handle.abort();
}

#[tokio::test]
async fn test_duplicate_user_conflicts() {
    let (_tmp, base, handle) = start_server().await;
    let client = reqwest::Client::new();
    create_user(&client, &base, "ada").await;

    let resp = client
        .post(format!("{}/users/", base))
        .json(&json!({"username": "ada", "email": "ada@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "conflict");
    handle.abort();
}

#[tokio::test]
async fn test_ingest_lookup_and_answer() {
    let (_tmp, base, handle) = start_server().await;
    let client = reqwest::Client::new();
    let user_id = create_user(&client, &base, "ada").await;

    let resp = client
        .post(format!("{}/documents/", base))
        .json(&json!({
            "title": "Crabs",
            "content": "Ferris the crab eats plankton.",
            "user_id": user_id,
            "metadata": {"lang": "en"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["chunks_processed"], 1);
    assert_eq!(body["vector_ids"].as_array().unwrap().len(), 1);
    let document_id = body["document_id"].as_str().unwrap().to_string();

    let summary: Value = client
        .get(format!("{}/documents/{}", base, document_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["title"], "Crabs");
    assert_eq!(summary["user_id"], json!(user_id));
    assert_eq!(summary["chunk_count"], 1);

    let resp = client
        .post(format!("{}/qa/", base))
        .json(&json!({"question": "What does Ferris eat?", "document_ids": [document_id]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let answer: Value = resp.json().await.unwrap();
    assert_eq!(answer["answer"], "Ferris the crab eats plankton.");
    assert_eq!(
        answer["sources"],
        json!([{"document_id": document_id, "title": "Crabs", "chunk_id": 0}])
    );
    handle.abort();
}

#[tokio::test]
async fn test_answer_with_no_documents() {
    let (_tmp, base, handle) = start_server().await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/qa", base))
        .json(&json!({"question": "Anything?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body,
        json!({"answer": "No relevant documents found to answer your question.", "sources": []})
    );
    handle.abort();
}

#[tokio::test]
async fn test_select_reports_missing_ids() {
    let (_tmp, base, handle) = start_server().await;
    let client = reqwest::Client::new();
    let user_id = create_user(&client, &base, "ada").await;

    let body: Value = client
        .post(format!("{}/documents", base))
        .json(&json!({"title": "Real", "content": "Real content.", "user_id": user_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let real = body["document_id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{}/documents/select/", base))
        .json(&json!({"document_ids": [real, "missing-1"], "user_id": user_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["message"], "Documents not found: missing-1");

    let resp = client
        .post(format!("{}/documents/select", base))
        .json(&json!({"document_ids": [real]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"status": "success", "selected_documents": [real]})
    );
    handle.abort();
}

#[tokio::test]
async fn test_batch_ingestion() {
    let (_tmp, base, handle) = start_server().await;
    let client = reqwest::Client::new();
    let user_id = create_user(&client, &base, "ada").await;

    let resp = client
        .post(format!("{}/documents/batch", base))
        .json(&json!({"documents": [
            {"title": "One", "content": "First document.", "user_id": user_id},
            {"title": "Two", "content": "Second document.", "user_id": user_id}
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_ne!(results[0]["document_id"], results[1]["document_id"]);
    handle.abort();
}

#[tokio::test]
async fn test_validation_errors() {
    let (_tmp, base, handle) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/qa", base))
        .json(&json!({"question": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/documents", base))
        .json(&json!({"title": "No content or owner"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/qa", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .get(format!("{}/documents/does-not-exist", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    handle.abort();
}

#[tokio::test]
async fn test_taken_document_id_conflicts() {
    let (_tmp, base, handle) = start_server().await;
    let client = reqwest::Client::new();
    let user_id = create_user(&client, &base, "ada").await;

    let post = |content: &'static str| {
        client
            .post(format!("{}/documents", base))
            .json(&json!({
                "title": "Pinned",
                "content": content,
                "user_id": user_id,
                "metadata": {"document_id": "pinned-id"}
            }))
            .send()
    };
    assert_eq!(post("First version.").await.unwrap().status(), 201);

    let resp = post("Second version.").await.unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "conflict");
    handle.abort();
}
