//! Interaction logging
//!
//! Best-effort, append-only. A failed or unconfigured write returns `false`
//! and is only reported through tracing; callers never block on it unless
//! they choose to await the detached handle.

use crate::providers::{ProviderOutcome, ProviderRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod store;

pub use store::{
    build_store, InMemoryInteractionStore, InteractionStore, PostgresInteractionStore,
    StoreCredentials,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub city: String,
    pub forecast_year: i32,
    pub user_query: String,
    pub predicted_score: f64,
    pub responses: Vec<ProviderRecord>,
    /// SHA-256 over every other field
    pub digest: String,
}

#[derive(Serialize)]
struct DigestView<'a> {
    id: &'a Uuid,
    timestamp: &'a DateTime<Utc>,
    city: &'a str,
    forecast_year: i32,
    user_query: &'a str,
    predicted_score: f64,
    responses: &'a [ProviderRecord],
}

impl InteractionLogEntry {
    pub fn new(
        city: impl Into<String>,
        forecast_year: i32,
        user_query: impl Into<String>,
        predicted_score: f64,
        outcomes: &[ProviderOutcome],
    ) -> Self {
        let mut entry = Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            city: city.into(),
            forecast_year,
            user_query: user_query.into(),
            predicted_score,
            responses: outcomes.iter().map(ProviderOutcome::to_record).collect(),
            digest: String::new(),
        };
        entry.digest = entry.compute_digest();
        entry
    }

    pub fn compute_digest(&self) -> String {
        let view = DigestView {
            id: &self.id,
            timestamp: &self.timestamp,
            city: &self.city,
            forecast_year: self.forecast_year,
            user_query: &self.user_query,
            predicted_score: self.predicted_score,
            responses: &self.responses,
        };

        // Sha256 is an io::Write sink, so the JSON is hashed as it is produced
        let mut hasher = Sha256::new();
        if serde_json::to_writer(&mut hasher, &view).is_err() {
            return String::new();
        }
        hex::encode(hasher.finalize())
    }

    pub fn verify_digest(&self) -> bool {
        !self.digest.is_empty() && self.digest == self.compute_digest()
    }
}

#[derive(Clone, Default)]
pub struct InteractionLogger {
    store: Option<Arc<dyn InteractionStore>>,
}

impl InteractionLogger {
    pub fn new(store: Arc<dyn InteractionStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Uninitialized logger; every write reports `false`
    pub fn offline() -> Self {
        Self { store: None }
    }

    pub fn from_store(store: Option<Arc<dyn InteractionStore>>) -> Self {
        Self { store }
    }

    pub fn is_online(&self) -> bool {
        self.store.is_some()
    }

    pub async fn log(&self, entry: &InteractionLogEntry) -> bool {
        let Some(store) = self.store.as_ref() else {
            debug!("Interaction logger offline, entry dropped");
            return false;
        };
        write_entry(store.as_ref(), entry).await
    }

    /// Fire-and-forget write on its own task
    pub fn log_detached(&self, entry: InteractionLogEntry) -> JoinHandle<bool> {
        let store = self.store.clone();
        tokio::spawn(async move {
            match store {
                Some(store) => write_entry(store.as_ref(), &entry).await,
                None => false,
            }
        })
    }
}

async fn write_entry(store: &dyn InteractionStore, entry: &InteractionLogEntry) -> bool {
    match store.append(entry).await {
        Ok(()) => {
            debug!(store = store.name(), entry_id = %entry.id, "Interaction logged");
            true
        }
        Err(e) => {
            warn!(store = store.name(), entry_id = %entry.id, "Interaction log write failed: {}", e);
            false
        }
    }
}
