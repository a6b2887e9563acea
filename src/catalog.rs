//! Relational store: users, documents, chunk records and selections.
//!
//! All writes that touch more than one row run inside a single SQL
//! transaction; an error before `commit` drops the transaction and rolls
//! it back.

use anyhow::Result;
use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

use docqa_core::chunk::content_hash;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Document row plus the number of chunk records it owns.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub created_at: String,
    pub chunk_count: i64,
}

/// One chunk record to persist alongside its document.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Vector-store-assigned id.
    pub id: String,
    pub chunk_index: i64,
    pub content: String,
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Insert a user with a fresh UUID. Username and email must be unique.
pub async fn create_user(pool: &SqlitePool, username: &str, email: &str) -> ServiceResult<User> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    let result =
        sqlx::query("INSERT INTO users (id, username, email, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(username)
            .bind(email)
            .bind(now)
            .execute(pool)
            .await;

    match result {
        Ok(_) => Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
        }),
        Err(e) if is_unique_violation(&e) => Err(ServiceError::Conflict(format!(
            "username or email already registered: {}",
            username
        ))),
        Err(e) => Err(ServiceError::internal(
            "user creation",
            anyhow::anyhow!("Database error: {}", e),
        )),
    }
}

pub async fn user_exists(pool: &SqlitePool, user_id: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn document_exists(pool: &SqlitePool, document_id: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM documents WHERE id = ?")
        .bind(document_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Insert a document row and its chunk records in one transaction.
pub async fn insert_document(
    pool: &SqlitePool,
    document_id: &str,
    title: &str,
    user_id: &str,
    chunks: &[ChunkRecord],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO documents (id, title, user_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(document_id)
        .bind(title)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    for chunk in chunks {
        sqlx::query(
            r#"
            INSERT INTO document_chunks (id, document_id, chunk_index, content, hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(content_hash(&chunk.content))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Return the ids in `ids` that have no document row, in request order,
/// without duplicates.
pub async fn find_missing_documents(pool: &SqlitePool, ids: &[String]) -> Result<Vec<String>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id FROM documents WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let found: HashSet<String> = builder
        .build()
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.get::<String, _>("id"))
        .collect();

    let mut missing: Vec<String> = Vec::new();
    for id in ids {
        if !found.contains(id) && !missing.contains(id) {
            missing.push(id.clone());
        }
    }
    Ok(missing)
}

/// Record `(user_id, document_id)` selections in one transaction.
/// Re-selecting an already selected document is a no-op.
pub async fn record_selection(
    pool: &SqlitePool,
    user_id: &str,
    document_ids: &[String],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for document_id in document_ids {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO selected_documents (id, user_id, document_id, selected_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(document_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Document ids selected by a user, oldest selection first.
pub async fn list_selection(pool: &SqlitePool, user_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT document_id FROM selected_documents WHERE user_id = ? ORDER BY selected_at, rowid",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| row.get("document_id")).collect())
}

pub async fn get_document_summary(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<DocumentSummary>> {
    let row = sqlx::query(
        r#"
        SELECT d.id, d.title, d.user_id, d.created_at,
               (SELECT COUNT(*) FROM document_chunks c WHERE c.document_id = d.id) AS chunk_count
        FROM documents d
        WHERE d.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| DocumentSummary {
        id: r.get("id"),
        title: r.get("title"),
        user_id: r.get("user_id"),
        created_at: format_ts_iso(r.get("created_at")),
        chunk_count: r.get("chunk_count"),
    }))
}
