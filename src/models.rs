//! Static model catalog.
//!
//! Aliases are the only identifiers the UI and orchestrator exchange;
//! vendor-specific model ids stay behind the adapter boundary. Unknown
//! aliases fall back to [`DEFAULT_MODEL_ID`].

use serde::{Deserialize, Serialize};

/// Vendor owning a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    OpenAi,
    Anthropic,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Anthropic => "anthropic",
        }
    }
}

/// A user-facing model catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct ModelDescriptor {
    pub alias: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub is_latest: bool,
    pub vendor: Vendor,
    /// Actual model id sent to the vendor API.
    pub model_id: &'static str,
}

/// Model id used when an alias is unknown or absent.
pub const DEFAULT_MODEL_ID: &str = "gpt-3.5-turbo";

pub const CATALOG: &[ModelDescriptor] = &[
    ModelDescriptor {
        alias: "claude-3-5-sonnet-latest",
        name: "Claude 3.5 Sonnet",
        description: "Latest Claude 3.5 Sonnet model for balanced performance",
        is_latest: true,
        vendor: Vendor::Anthropic,
        model_id: "claude-3-sonnet-20240229",
    },
    ModelDescriptor {
        alias: "claude-3-5-haiku-latest",
        name: "Claude 3.5 Haiku",
        description: "Latest Claude 3.5 Haiku model for faster responses",
        is_latest: true,
        vendor: Vendor::Anthropic,
        model_id: "claude-3-haiku-20240229",
    },
    ModelDescriptor {
        alias: "gpt-4o",
        name: "GPT-4 Optimized",
        description: "Latest stable GPT-4 model with improved performance",
        is_latest: false,
        vendor: Vendor::OpenAi,
        model_id: "gpt-4",
    },
    ModelDescriptor {
        alias: "gpt-4o-2024-08-06",
        name: "GPT-4 Optimized (Aug 2024)",
        description: "Specific version of GPT-4 optimized for stability",
        is_latest: false,
        vendor: Vendor::OpenAi,
        model_id: "gpt-4-0613",
    },
    ModelDescriptor {
        alias: "chatgpt-4o-latest",
        name: "ChatGPT-4 Latest",
        description: "Latest model used in ChatGPT",
        is_latest: true,
        vendor: Vendor::OpenAi,
        model_id: "gpt-4-turbo-preview",
    },
    ModelDescriptor {
        alias: "gpt-4o-mini",
        name: "GPT-4 Mini",
        description: "Lighter version of GPT-4 for faster responses",
        is_latest: false,
        vendor: Vendor::OpenAi,
        model_id: "gpt-3.5-turbo",
    },
];

/// Look up a catalog entry by alias.
pub fn find_model(alias: &str) -> Option<&'static ModelDescriptor> {
    CATALOG.iter().find(|m| m.alias == alias)
}

/// Resolve an alias to the vendor model id, falling back to the default.
pub fn model_id_for(alias: Option<&str>) -> &'static str {
    alias
        .and_then(find_model)
        .map(|m| m.model_id)
        .unwrap_or(DEFAULT_MODEL_ID)
}
