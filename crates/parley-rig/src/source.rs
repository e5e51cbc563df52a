//! Ollama-backed fragment source.

use async_trait::async_trait;
use futures::{StreamExt, future};
use parley_core::{FragmentSource, FragmentStream};
use rig::client::Nothing;
use rig::completion::CompletionModel;
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use rig::streaming::StreamedAssistantContent;

use crate::{Error, OllamaConfig, Result, TRACING_TARGET_OLLAMA};

const PROVIDER: &str = "ollama";

/// Streams chat completions from an Ollama server.
///
/// Each `open` issues one streaming request carrying the configured system
/// prompt and the user message. Only text deltas become fragments.
#[derive(Clone)]
pub struct OllamaSource {
    client: ollama::Client,
    model: String,
    system_prompt: String,
}

impl OllamaSource {
    /// Creates a source from validated configuration.
    ///
    /// No request is made until the first `open`.
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        config.validate()?;

        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(&config.ollama_host)
            .build()
            .map_err(|e| Error::provider(PROVIDER, e))?;

        tracing::debug!(
            target: TRACING_TARGET_OLLAMA,
            host = %config.ollama_host,
            model = %config.ollama_model,
            "Ollama client created"
        );

        Ok(Self {
            client,
            model: config.ollama_model.clone(),
            system_prompt: config.ollama_system_prompt.clone(),
        })
    }

    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl FragmentSource for OllamaSource {
    async fn open(&self, prompt: &str) -> parley_core::Result<FragmentStream> {
        let model = self.client.completion_model(self.model.as_str());

        let response = model
            .completion_request(prompt.to_owned())
            .preamble(self.system_prompt.clone())
            .stream()
            .await
            .map_err(|e| Error::provider(PROVIDER, e))?;

        tracing::debug!(
            target: TRACING_TARGET_OLLAMA,
            model = %self.model,
            prompt_len = prompt.len(),
            "Opened completion stream"
        );

        let fragments = response
            .filter_map(|item| {
                future::ready(match item {
                    Ok(StreamedAssistantContent::Text(text)) => Some(Ok(text.text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(parley_core::Error::from(Error::stream(e)))),
                })
            })
            .boxed();

        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_default_config() {
        let source = OllamaSource::new(&OllamaConfig::default()).unwrap();
        assert_eq!(source.model(), "llama3.2");
    }

    #[test]
    fn test_source_rejects_invalid_config() {
        let config = OllamaConfig::default().with_host("localhost");
        assert!(OllamaSource::new(&config).is_err());
    }
}
