//! Process-wide collaborators, constructed once at startup.
//!
//! Handlers and CLI commands borrow an [`AppContext`] instead of building
//! clients per request. Cloning is cheap: every field is a pool handle or
//! an `Arc`.

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

use docqa_core::chunk::Chunker;
use docqa_core::embedding::EmbeddingProvider;
use docqa_core::generate::AnswerGenerator;
use docqa_core::retrieve::Retriever;
use docqa_core::store::VectorStore;

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::generation::create_generator;
use crate::migrate;
use crate::vector_store::SqliteVectorStore;

#[derive(Clone)]
pub struct AppContext {
    pub pool: SqlitePool,
    pub chunker: Chunker,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn VectorStore>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub retriever: Retriever,
    pub top_k: usize,
}

impl AppContext {
    /// Connect to the database, apply migrations and build the configured
    /// providers. The vector store shares the relational database.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;

        let embedder = create_provider(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(pool.clone()));

        tracing::info!(
            db = %config.db.path.display(),
            embedding = embedder.model_name(),
            generation = generator.model_name(),
            "context ready"
        );

        Self::with_components(config, pool, embedder, store, generator)
    }

    /// Assemble a context from explicit collaborators.
    pub fn with_components(
        config: &Config,
        pool: SqlitePool,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        let retriever = Retriever::new(Arc::clone(&store), Arc::clone(&embedder));
        Ok(Self {
            pool,
            chunker: config.chunker()?,
            embedder,
            store,
            generator,
            retriever,
            top_k: config.retrieval.top_k,
        })
    }
}
