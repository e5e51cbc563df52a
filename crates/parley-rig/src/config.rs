//! Configuration for the Ollama fragment source.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Keep responses concise and friendly.";

/// Configuration of the Ollama model backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct OllamaConfig {
    /// Ollama server base URL.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_HOST)
    )]
    pub ollama_host: String,

    /// Model used to generate responses.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OLLAMA_MODEL", default_value = DEFAULT_MODEL)
    )]
    pub ollama_model: String,

    /// System prompt sent with every request.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OLLAMA_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)
    )]
    pub ollama_system_prompt: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_host: DEFAULT_HOST.to_string(),
            ollama_model: DEFAULT_MODEL.to_string(),
            ollama_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl OllamaConfig {
    /// Set the server base URL.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.ollama_host = host.into();
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.ollama_model = model.into();
        self
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.ollama_system_prompt = prompt.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let host = Url::parse(&self.ollama_host)
            .map_err(|e| Error::config(format!("invalid Ollama host '{}': {e}", self.ollama_host)))?;

        if !matches!(host.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Ollama host must use http or https, got '{}'",
                host.scheme()
            )));
        }

        if self.ollama_model.trim().is_empty() {
            return Err(Error::config("Ollama model cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OllamaConfig::default();
        assert_eq!(config.ollama_host, "http://localhost:11434");
        assert_eq!(config.ollama_model, "llama3.2");
        assert_eq!(
            config.ollama_system_prompt,
            "You are a helpful AI assistant. Keep responses concise and friendly."
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = OllamaConfig::default()
            .with_host("https://ollama.internal")
            .with_model("mistral")
            .with_system_prompt("Be brief.");

        assert_eq!(config.ollama_host, "https://ollama.internal");
        assert_eq!(config.ollama_model, "mistral");
        assert_eq!(config.ollama_system_prompt, "Be brief.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(OllamaConfig::default().with_host("not a url").validate().is_err());
        assert!(
            OllamaConfig::default()
                .with_host("ftp://localhost:11434")
                .validate()
                .is_err()
        );
        assert!(OllamaConfig::default().with_model("  ").validate().is_err());
    }
}
