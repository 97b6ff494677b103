use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{defaults, limits, paths};
use crate::llm::provider::{ProviderConfig, ProviderId};
use crate::llm::{GuardedClient, LlmClient};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub conversation: ConversationSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub charts: ChartSettings,
    #[serde(default)]
    pub voice: VoiceSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: ProviderId,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    pub max_messages: usize,
    pub keep_recent: usize,
    pub memory_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub max_file_size: u64,
    pub allowed_file_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub palette: Vec<String>,
    pub prediction_horizon: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub confidence_threshold: f32,
    pub filler_words: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: Option<PathBuf>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let provider = ProviderId::OpenAI;
        Self {
            model: provider.default_model().to_string(),
            api_key_env: provider.default_api_key_env().to_string(),
            provider,
            base_url: None,
            max_tokens: defaults::MAX_TOKENS,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            max_retries: defaults::MAX_RETRIES,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            max_messages: limits::MAX_CONVERSATION_MESSAGES,
            keep_recent: limits::KEEP_RECENT_MESSAGES,
            memory_capacity: limits::DATASET_MEMORY_CAPACITY,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_file_size: limits::MAX_FILE_SIZE,
            allowed_file_types: limits::ALLOWED_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            palette: defaults::CHART_PALETTE.iter().map(|s| s.to_string()).collect(),
            prediction_horizon: defaults::PREDICTION_HORIZON,
        }
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: defaults::CONFIDENCE_THRESHOLD,
            filler_words: defaults::FILLER_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(paths::CONFIG_DIR)
            .join(paths::CONFIG_FILE)
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from a specific file; a missing or unparsable file yields defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("ignoring invalid config {}: {}", config_path.display(), e),
                },
                Err(e) => tracing::warn!("cannot read config {}: {}", config_path.display(), e),
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), crate::error::DataSightError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), crate::error::DataSightError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::DataSightError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env).ok()
    }

    /// Switch provider, resetting model and key variable to that provider's defaults.
    pub fn set_provider(&mut self, provider: ProviderId) {
        self.llm.model = provider.default_model().to_string();
        self.llm.api_key_env = provider.default_api_key_env().to_string();
        self.llm.provider = provider;
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.max(1))
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| self.llm.provider.default_base_url().to_string()),
            id: self.llm.provider.clone(),
            api_key_env: self.llm.api_key_env.clone(),
            model: self.llm.model.clone(),
            max_tokens: self.llm.max_tokens,
        }
    }

    /// Build the LLM client for the configured provider, without timeout or retries.
    pub fn build_llm_client(&self) -> Result<Box<dyn LlmClient>, crate::error::DataSightError> {
        self.provider_config().build_client()
    }

    /// Wrap any client with the configured timeout and retry policy.
    pub fn guard_client(&self, client: Arc<dyn LlmClient>) -> GuardedClient {
        GuardedClient::new(client, self.request_timeout()).with_retries(
            self.llm.max_retries,
            Duration::from_millis(self.llm.retry_backoff_ms),
        )
    }

    pub fn data_dir(&self) -> Result<PathBuf, crate::error::DataSightError> {
        match self.storage.data_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => crate::context::FileStore::default_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [llm]
            provider = "ollama"
            model = "llava:13b"

            [conversation]
            keep_recent = 6
            "#,
        )
        .unwrap();

        assert_eq!(settings.llm.provider, ProviderId::Ollama);
        assert_eq!(settings.llm.model, "llava:13b");
        assert_eq!(settings.llm.timeout_secs, 30);
        assert_eq!(settings.conversation.keep_recent, 6);
        assert_eq!(settings.conversation.max_messages, 12);
        assert_eq!(settings.ingest.allowed_file_types.len(), 6);
    }

    #[test]
    fn test_set_provider_resets_model_and_key() {
        let mut settings = Settings::default();
        settings.set_provider(ProviderId::OpenRouter);
        assert_eq!(settings.llm.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(settings.provider_config().base_url, "https://openrouter.ai/api");
    }

    #[test]
    fn test_base_url_override_wins() {
        let mut settings = Settings::default();
        settings.llm.base_url = Some("http://proxy.local".to_string());
        assert_eq!(settings.provider_config().base_url, "http://proxy.local");
    }
}
