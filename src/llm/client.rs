use anyhow::Result;
use std::sync::Arc;

use super::provider::{create_provider, VisionProvider};
use crate::config::LlmConfig;

/// Client wrapper over a vision provider implementation.
pub struct LlmClient {
    provider: Arc<dyn VisionProvider>,
}

impl LlmClient {
    /// Create a new LlmClient from configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        let provider = create_provider(config);

        Self {
            provider: Arc::from(provider),
        }
    }

    /// Wrap an existing provider. Tests use this to substitute a canned
    /// model.
    pub fn from_provider(provider: Box<dyn VisionProvider>) -> Self {
        Self {
            provider: Arc::from(provider),
        }
    }

    /// Get the provider name
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Run one critique inference over the prepared prompt and image.
    pub fn critique_image(&self, prompt: &str, image: &[u8]) -> Result<String> {
        self.provider.critique_image(prompt, image)
    }
}

// Make LlmClient Clone by wrapping provider in Arc
impl Clone for LlmClient {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}
