//! Model capability metadata: which upstream endpoints a model supports and
//! its default output token limit.

use std::collections::HashMap;

use crate::config::{Endpoint, ModelConfig};

/// Endpoints a model can be served through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedEndpoints {
    pub responses: bool,
    pub chat_completions: bool,
}

impl SupportedEndpoints {
    pub const BOTH: Self = Self {
        responses: true,
        chat_completions: true,
    };

    /// `None` means the model does not say, which is treated as both.
    pub fn from_declared(declared: Option<&[Endpoint]>) -> Self {
        match declared {
            None => Self::BOTH,
            Some(list) => Self {
                responses: list.contains(&Endpoint::Responses),
                chat_completions: list.contains(&Endpoint::ChatCompletions),
            },
        }
    }

    pub fn any(&self) -> bool {
        self.responses || self.chat_completions
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub endpoints: SupportedEndpoints,
    pub max_output_tokens: Option<u64>,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            endpoints: SupportedEndpoints::BOTH,
            max_output_tokens: None,
        }
    }
}

/// Lookup of per-model metadata.
pub trait ModelCatalog: Send + Sync {
    /// Unknown models get [`ModelInfo::default`].
    fn lookup(&self, model: &str) -> ModelInfo;

    /// Model ids the catalog knows about, for listing.
    fn known_models(&self) -> Vec<(String, ModelInfo)>;
}

/// Catalog backed by the `[models]` table of the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticModelCatalog {
    models: HashMap<String, ModelInfo>,
}

impl StaticModelCatalog {
    pub fn from_config(models: &HashMap<String, ModelConfig>) -> Self {
        let models = models
            .iter()
            .map(|(id, cfg)| {
                (
                    id.clone(),
                    ModelInfo {
                        endpoints: SupportedEndpoints::from_declared(cfg.endpoints.as_deref()),
                        max_output_tokens: cfg.max_output_tokens,
                    },
                )
            })
            .collect();
        Self { models }
    }

    #[must_use]
    pub fn with_model(mut self, id: impl Into<String>, info: ModelInfo) -> Self {
        self.models.insert(id.into(), info);
        self
    }
}

impl ModelCatalog for StaticModelCatalog {
    fn lookup(&self, model: &str) -> ModelInfo {
        self.models.get(model).cloned().unwrap_or_default()
    }

    fn known_models(&self) -> Vec<(String, ModelInfo)> {
        let mut list: Vec<_> = self
            .models
            .iter()
            .map(|(id, info)| (id.clone(), info.clone()))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }
}
