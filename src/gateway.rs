//! Multi-provider gateway
//!
//! Sends one context-augmented prompt to every provider and gathers the
//! outcomes in provider order. Calls are independent: no retry, no shared
//! mutable state, and a failure in one never affects the others.

use crate::dataset::CityDataset;
use crate::error::AdvisorError;
use crate::history::ChatTurn;
use crate::providers::{ChatRequest, LlmProvider, ProviderOutcome};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct LlmGateway {
    providers: Vec<Arc<dyn LlmProvider>>,
    dataset: Option<Arc<CityDataset>>,
    parallel: bool,
}

impl LlmGateway {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self {
            providers,
            dataset: None,
            parallel: true,
        }
    }

    /// Prepend dataset context for cities mentioned in each query
    pub fn with_dataset(mut self, dataset: Arc<CityDataset>) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// The message every provider receives for `query`
    pub fn build_prompt(&self, query: &str) -> String {
        let context = self
            .dataset
            .as_ref()
            .map(|dataset| dataset.city_context(query))
            .unwrap_or_default();

        format!("{}\n\nUser Question: {}", context, query)
    }

    /// Ask every provider with the same history
    pub async fn ask(&self, query: &str, history: &[ChatTurn]) -> Vec<ProviderOutcome> {
        self.ask_each(query, |_| Some(history.to_vec())).await
    }

    /// Ask the providers for which `history_for` returns a history; the rest
    /// are skipped
    pub async fn ask_each<F>(&self, query: &str, mut history_for: F) -> Vec<ProviderOutcome>
    where
        F: FnMut(&str) -> Option<Vec<ChatTurn>>,
    {
        let prompt = self.build_prompt(query);

        let targets: Vec<(Arc<dyn LlmProvider>, ChatRequest)> = self
            .providers
            .iter()
            .filter_map(|provider| {
                history_for(provider.name())
                    .map(|history| (provider.clone(), ChatRequest::new(prompt.clone(), history)))
            })
            .collect();

        info!(
            providers = targets.len(),
            parallel = self.parallel,
            "Dispatching query to providers"
        );

        if self.parallel {
            fan_out(targets).await
        } else {
            let mut outcomes = Vec::with_capacity(targets.len());
            for (provider, request) in targets {
                let name = provider.name().to_string();
                outcomes.push(join(name, tokio::spawn(call(provider, request))).await);
            }
            outcomes
        }
    }
}

async fn call(provider: Arc<dyn LlmProvider>, request: ChatRequest) -> ProviderOutcome {
    let name = provider.name().to_string();
    match provider.complete(&request).await {
        Ok(text) => ProviderOutcome::success(name, text),
        Err(AdvisorError::Provider(reason)) => {
            warn!(provider = %name, "Provider call failed: {}", reason);
            ProviderOutcome::failure(name, reason)
        }
        Err(e) => {
            warn!(provider = %name, "Provider call failed: {}", e);
            ProviderOutcome::failure(name, e)
        }
    }
}

/// One task per provider; results are gathered in submission order
async fn fan_out(targets: Vec<(Arc<dyn LlmProvider>, ChatRequest)>) -> Vec<ProviderOutcome> {
    let handles: Vec<_> = targets
        .into_iter()
        .map(|(provider, request)| {
            let name = provider.name().to_string();
            (name, tokio::spawn(call(provider, request)))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        outcomes.push(join(name, handle).await);
    }
    outcomes
}

/// A panicked or cancelled provider task becomes a failure outcome
async fn join(name: String, handle: JoinHandle<ProviderOutcome>) -> ProviderOutcome {
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(provider = %name, "Provider task aborted: {}", e);
            ProviderOutcome::failure(name, format!("task failed: {}", e))
        }
    }
}
