//! Adapter selection by model alias.

use super::{AnthropicProvider, ChatProvider, OpenAiProvider};
use crate::models::{self, Vendor};
use std::sync::Arc;

/// Seam between the orchestrator and the adapters; lets tests substitute
/// stub providers without touching vendor code.
pub trait ProviderSelector: Send + Sync {
    fn get(&self, model_alias: Option<&str>) -> Arc<dyn ChatProvider>;
}

/// Catalog-driven selector over the two vendor adapters.
pub struct ProviderFactory {
    openai: Arc<OpenAiProvider>,
    anthropic: Arc<AnthropicProvider>,
}

impl ProviderFactory {
    pub fn new(openai: Arc<OpenAiProvider>, anthropic: Arc<AnthropicProvider>) -> Self {
        Self { openai, anthropic }
    }
}

impl ProviderSelector for ProviderFactory {
    /// Pure lookup: the catalog entry owning the alias decides the adapter;
    /// unknown or absent aliases fall back to OpenAI.
    fn get(&self, model_alias: Option<&str>) -> Arc<dyn ChatProvider> {
        match model_alias
            .and_then(models::find_model)
            .map(|m| m.vendor)
        {
            Some(Vendor::Anthropic) => self.anthropic.clone(),
            Some(Vendor::OpenAi) | None => self.openai.clone(),
        }
    }
}
