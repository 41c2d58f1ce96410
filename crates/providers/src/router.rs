//! Provider router: builds providers from config and picks the one to use.

use std::collections::HashMap;
use std::sync::Arc;

use lectern_config::{AppConfig, ProviderConfig};
use lectern_core::provider::Provider;
use tracing::debug;

use crate::fallback::FallbackProvider;
use crate::openai_compat::{DEFAULT_TIMEOUT, OpenAiCompatProvider};

/// Named providers plus the order they are tried in.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
    fallback_order: Vec<String>,
    timeouts: HashMap<String, std::time::Duration>,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
            fallback_order: Vec::new(),
            timeouts: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// The provider the pipeline should call.
    ///
    /// With no fallbacks configured this is the default provider itself;
    /// otherwise a [`FallbackProvider`] over default + fallbacks, in order.
    /// Unknown fallback names are skipped.
    pub fn primary(&self) -> Option<Arc<dyn Provider>> {
        let default = self.default_provider()?;
        if self.fallback_order.is_empty() {
            return Some(default);
        }

        let mut chain = FallbackProvider::new("fallback")
            .add(default, self.timeout_for(&self.default_provider));
        for name in &self.fallback_order {
            match self.get(name) {
                Some(provider) => chain = chain.add(provider, self.timeout_for(name)),
                None => debug!(provider = %name, "Skipping unregistered fallback provider"),
            }
        }
        Some(Arc::new(chain))
    }

    /// Every provider in try order, for health reporting.
    pub fn chain(&self) -> FallbackProvider {
        std::iter::once(&self.default_provider)
            .chain(&self.fallback_order)
            .filter_map(|name| self.get(name).map(|p| (p, self.timeout_for(name))))
            .fold(FallbackProvider::new("health"), |chain, (p, t)| chain.add(p, t))
    }

    fn timeout_for(&self, name: &str) -> std::time::Duration {
        self.timeouts.get(name).copied().unwrap_or(DEFAULT_TIMEOUT)
    }
}

/// Build providers from configuration.
///
/// Every configured provider, the default provider and every fallback name
/// is registered; unconfigured ones use the well-known base URL and the
/// global API key.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);
    router.fallback_order = config.fallback_providers.clone();

    let unconfigured = ProviderConfig::default();
    let names = config
        .providers
        .keys()
        .chain(std::iter::once(&config.default_provider))
        .chain(&config.fallback_providers);

    for name in names {
        if router.get(name).is_some() {
            continue;
        }
        let provider_config = config.providers.get(name).unwrap_or(&unconfigured);
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();
        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));
        let timeout = provider_config.timeout().unwrap_or(DEFAULT_TIMEOUT);

        router.timeouts.insert(name.clone(), timeout);
        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key).with_timeout(timeout)),
        );
    }

    router
}

/// Default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
