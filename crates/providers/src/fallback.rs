//! Ordered provider chain with per-provider timeouts.
//!
//! A generation call tries each provider in turn until one answers. This
//! sits below the orchestrator's retry loop: one orchestrator attempt is
//! one pass over the chain.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lectern_core::error::ProviderError;
use lectern_core::provider::{Provider, ProviderRequest, ProviderResponse};
use serde::Serialize;
use tracing::{info, warn};

use crate::openai_compat::DEFAULT_TIMEOUT;

/// A provider that wraps an ordered list of providers and falls back on failure.
pub struct FallbackProvider {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

/// Reachability of one chain member, as reported by `doctor`.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FallbackProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    pub fn add(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { provider, timeout });
        self
    }

    pub fn add_default(self, provider: Arc<dyn Provider>) -> Self {
        self.add(provider, DEFAULT_TIMEOUT)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Provider names in try order.
    pub fn members(&self) -> Vec<&str> {
        self.chain.iter().map(|e| e.provider.name()).collect()
    }

    /// Check every member, in order, within its timeout.
    pub async fn health_report(&self) -> Vec<ProviderHealth> {
        let mut report = Vec::with_capacity(self.chain.len());
        for entry in &self.chain {
            let name = entry.provider.name().to_string();
            let (healthy, error) =
                match tokio::time::timeout(entry.timeout, entry.provider.health_check()).await {
                    Ok(Ok(healthy)) => (healthy, None),
                    Ok(Err(e)) => (false, Some(e.to_string())),
                    Err(_) => (
                        false,
                        Some(format!("timed out after {}s", entry.timeout.as_secs())),
                    ),
                };
            report.push(ProviderHealth {
                name,
                healthy,
                error,
            });
        }
        report
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut last_error = ProviderError::NotConfigured("No providers in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let provider_name = entry.provider.name();

            info!(
                provider = %provider_name,
                position = i + 1,
                total = self.chain.len(),
                "Fallback: trying provider"
            );

            match tokio::time::timeout(entry.timeout, entry.provider.generate(request.clone()))
                .await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(
                        provider = %provider_name,
                        error = %e,
                        "Fallback: provider failed, trying next"
                    );
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        provider = %provider_name,
                        timeout_secs = entry.timeout.as_secs(),
                        "Fallback: provider timed out, trying next"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {}s",
                        provider_name,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let mut all_models = Vec::new();
        for entry in &self.chain {
            if let Ok(models) = entry.provider.list_models().await {
                all_models.extend(models);
            }
        }
        Ok(all_models)
    }

    /// Healthy when any member is.
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(self.health_report().await.iter().any(|h| h.healthy))
    }
}
