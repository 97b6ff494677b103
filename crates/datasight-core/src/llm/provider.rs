use crate::constants::{endpoints, models};
use crate::error::DataSightError;
use serde::{Deserialize, Serialize};

/// Identifies a chat-completions provider. Every provider here speaks the
/// OpenAI wire dialect; they differ in base URL, key and default model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    Custom(String),
}

impl ProviderId {
    pub fn name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::OpenRouter => "OpenRouter",
            Self::Ollama => "Ollama (Local)",
            Self::LmStudio => "LM Studio (Local)",
            Self::Custom(name) => name,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama | Self::LmStudio)
    }

    pub fn needs_api_key(&self) -> bool {
        !self.is_local()
    }

    pub fn default_base_url(&self) -> &str {
        match self {
            Self::OpenAI => endpoints::OPENAI_BASE_URL,
            Self::OpenRouter => endpoints::OPENROUTER_BASE_URL,
            Self::Ollama => endpoints::OLLAMA_BASE_URL,
            Self::LmStudio => endpoints::LMSTUDIO_BASE_URL,
            Self::Custom(_) => "",
        }
    }

    pub fn default_api_key_env(&self) -> &str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Ollama | Self::LmStudio => "",
            Self::Custom(_) => "DATASIGHT_API_KEY",
        }
    }

    pub fn default_model(&self) -> &str {
        match self {
            Self::OpenAI => models::DEFAULT_OPENAI_MODEL,
            Self::OpenRouter => models::DEFAULT_OPENROUTER_MODEL,
            Self::Ollama => models::DEFAULT_OLLAMA_MODEL,
            Self::LmStudio => models::DEFAULT_LMSTUDIO_MODEL,
            Self::Custom(_) => models::DEFAULT_OPENAI_MODEL,
        }
    }

    /// Parse a provider name as typed on the command line.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "openai" => Self::OpenAI,
            "openrouter" => Self::OpenRouter,
            "ollama" => Self::Ollama,
            "lmstudio" | "lm_studio" => Self::LmStudio,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolved connection details for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: ProviderId,
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl ProviderConfig {
    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env).ok()
    }

    pub fn build_client(&self) -> Result<Box<dyn super::LlmClient>, DataSightError> {
        if self.base_url.is_empty() {
            return Err(DataSightError::Config(format!(
                "Provider {} has no base_url configured",
                self.id
            )));
        }

        let api_key = if self.id.needs_api_key() {
            self.api_key().ok_or_else(|| {
                DataSightError::Config(format!(
                    "Set {} environment variable for {}",
                    self.api_key_env,
                    self.id.name()
                ))
            })?
        } else {
            String::new()
        };

        let client = super::OpenAIClient::new(api_key)
            .with_model(&self.model)
            .with_base_url(&self.base_url)
            .with_max_tokens(self.max_tokens);
        Ok(Box::new(client))
    }
}

/// Token usage tracking across a session.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub request_count: u64,
}

impl UsageTracker {
    pub fn track(&mut self, input: u32, output: u32) {
        self.total_input_tokens += input as u64;
        self.total_output_tokens += output as u64;
        self.request_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_providers_need_no_key() {
        assert!(!ProviderId::Ollama.needs_api_key());
        assert!(!ProviderId::LmStudio.needs_api_key());
        assert!(ProviderId::OpenAI.needs_api_key());
    }

    #[test]
    fn test_parse_known_and_custom_names() {
        assert_eq!(ProviderId::parse("OpenRouter"), ProviderId::OpenRouter);
        assert_eq!(ProviderId::parse("lm_studio"), ProviderId::LmStudio);
        assert_eq!(
            ProviderId::parse("websim"),
            ProviderId::Custom("websim".to_string())
        );
    }

    #[test]
    fn test_build_client_requires_key_for_cloud_provider() {
        let config = ProviderConfig {
            id: ProviderId::OpenAI,
            api_key_env: "DATASIGHT_TEST_MISSING_KEY".to_string(),
            base_url: ProviderId::OpenAI.default_base_url().to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 1024,
        };
        assert!(matches!(
            config.build_client(),
            Err(DataSightError::Config(_))
        ));
    }

    #[test]
    fn test_build_client_for_local_provider() {
        let config = ProviderConfig {
            id: ProviderId::Ollama,
            api_key_env: String::new(),
            base_url: ProviderId::Ollama.default_base_url().to_string(),
            model: "llava".to_string(),
            max_tokens: 1024,
        };
        assert!(config.build_client().is_ok());
    }

    #[test]
    fn test_usage_tracker_accumulates() {
        let mut tracker = UsageTracker::default();
        tracker.track(10, 5);
        tracker.track(3, 2);
        assert_eq!(tracker.total_input_tokens, 13);
        assert_eq!(tracker.total_output_tokens, 7);
        assert_eq!(tracker.request_count, 2);
    }
}
