//! Document-store backends for interaction logs
//!
//! The store is append-only: one collection, write-once documents.

use super::InteractionLogEntry;
use crate::error::AdvisorError;
use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

pub const DEFAULT_COLLECTION: &str = "consultation_logs";
pub const DEFAULT_CREDENTIALS_FILE: &str = "store_credentials.json";

#[async_trait::async_trait]
pub trait InteractionStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn append(&self, entry: &InteractionLogEntry) -> Result<()>;
}

//
// ================= Credentials =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreCredentials {
    pub database_url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl StoreCredentials {
    /// `DOCUMENT_STORE_CONFIG` (JSON blob) takes precedence over the local
    /// credential file. `Ok(None)` when neither is present.
    pub fn discover() -> Result<Option<Self>> {
        if let Ok(blob) = env::var("DOCUMENT_STORE_CONFIG") {
            if !blob.trim().is_empty() {
                return Self::from_json(&blob).map(Some);
            }
        }

        let file = env::var("DOCUMENT_STORE_CREDENTIALS_FILE")
            .unwrap_or_else(|_| DEFAULT_CREDENTIALS_FILE.to_string());
        Self::from_file(Path::new(&file))
    }

    pub fn from_json(blob: &str) -> Result<Self> {
        serde_json::from_str(blob)
            .map_err(|e| AdvisorError::Config(format!("invalid document store credentials: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map(Some)
    }
}

//
// ================= In-Memory =================
//

/// Process-local store for development and tests
#[derive(Default)]
pub struct InMemoryInteractionStore {
    entries: Arc<RwLock<Vec<InteractionLogEntry>>>,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<InteractionLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait::async_trait]
impl InteractionStore for InMemoryInteractionStore {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn append(&self, entry: &InteractionLogEntry) -> Result<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }
}

//
// ================= Postgres (JSONB documents) =================
//

pub struct PostgresInteractionStore {
    pool: PgPool,
    collection: String,
    schema_ready: OnceCell<()>,
}

impl PostgresInteractionStore {
    /// Lazily connected; no I/O happens until the first append
    pub fn connect_lazy(credentials: &StoreCredentials) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(credentials.max_connections)
            .connect_lazy(&credentials.database_url)?;

        Ok(Self {
            pool,
            collection: credentials.collection.clone(),
            schema_ready: OnceCell::new(),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS interaction_documents (
                      id UUID PRIMARY KEY,
                      collection TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL,
                      document JSONB NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_interaction_documents_collection_time
                    ON interaction_documents (collection, created_at);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                AdvisorError::Store(format!("Failed to initialize document schema: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl InteractionStore for PostgresInteractionStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn append(&self, entry: &InteractionLogEntry) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO interaction_documents (id, collection, created_at, document)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.id)
        .bind(&self.collection)
        .bind(entry.timestamp)
        .bind(sqlx::types::Json(entry))
        .execute(&self.pool)
        .await
        .map_err(|e| AdvisorError::Store(format!("Failed to append interaction: {}", e)))?;

        Ok(())
    }
}

/// Backend for the discovered credentials, or `None` when the logger should
/// stay offline
pub fn build_store(credentials: Option<StoreCredentials>) -> Option<Arc<dyn InteractionStore>> {
    let Some(credentials) = credentials else {
        warn!("Document store credentials not found, interaction logging offline");
        return None;
    };

    match PostgresInteractionStore::connect_lazy(&credentials) {
        Ok(store) => {
            info!(collection = %credentials.collection, "Interaction log backend: postgres");
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!("Failed to initialize document store, logging offline: {}", e);
            None
        }
    }
}
