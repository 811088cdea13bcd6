use crate::error::QueryError;
use std::path::PathBuf;

const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/complete";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-2.1";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_KNOWLEDGE_BASE_PATH: &str = "knowledgebase.md";
const DEFAULT_MAX_TOKENS_TO_SAMPLE: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Which completion API answers the queries
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    Anthropic {
        api_key: String,
        api_url: String,
    },
    Ollama {
        api_key: Option<String>,
        base_url: String,
    },
}

/// Fixed generation parameters sent with every completion request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens_to_sample: u32,
    pub temperature: f32,
}

/// Handler configuration, resolved once during cold start
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub generation: GenerationParams,
    pub knowledge_base_path: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, QueryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, QueryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                QueryError::Configuration(format!("environment variable {key} is not set"))
            })
        };

        let provider_name = get("COMPLETION_PROVIDER").unwrap_or_else(|| "anthropic".to_string());

        let (provider, model) = match provider_name.to_ascii_lowercase().as_str() {
            "anthropic" => (
                ProviderConfig::Anthropic {
                    api_key: require("ANTHROPIC_API_KEY")?,
                    api_url: get("ANTHROPIC_API_URL")
                        .unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string()),
                },
                get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            ),
            "ollama" => (
                ProviderConfig::Ollama {
                    api_key: get("OLLAMA_API_KEY"),
                    base_url: get("OLLAMA_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                },
                require("OLLAMA_MODEL")?,
            ),
            other => {
                return Err(QueryError::Configuration(format!(
                    "unknown COMPLETION_PROVIDER '{other}'. Must be one of: anthropic, ollama"
                )))
            }
        };

        let max_tokens_to_sample = match get("MAX_TOKENS_TO_SAMPLE") {
            Some(raw) => raw.parse().map_err(|_| {
                QueryError::Configuration(format!("MAX_TOKENS_TO_SAMPLE is not an integer: {raw}"))
            })?,
            None => DEFAULT_MAX_TOKENS_TO_SAMPLE,
        };

        let temperature = match get("TEMPERATURE") {
            Some(raw) => raw.parse().map_err(|_| {
                QueryError::Configuration(format!("TEMPERATURE is not a number: {raw}"))
            })?,
            None => DEFAULT_TEMPERATURE,
        };

        Ok(Self {
            provider,
            generation: GenerationParams {
                model,
                max_tokens_to_sample,
                temperature,
            },
            knowledge_base_path: get("KNOWLEDGE_BASE_PATH")
                .unwrap_or_else(|| DEFAULT_KNOWLEDGE_BASE_PATH.to_string())
                .into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_anthropic_key_is_a_configuration_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, QueryError::Configuration(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn blank_anthropic_key_is_a_configuration_error() {
        let err = Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, QueryError::Configuration(_)));
    }

    #[test]
    fn anthropic_defaults() {
        let config = Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();
        assert_eq!(
            config.provider,
            ProviderConfig::Anthropic {
                api_key: "sk-test".into(),
                api_url: DEFAULT_ANTHROPIC_URL.into(),
            }
        );
        assert_eq!(config.generation.model, "claude-2.1");
        assert_eq!(config.generation.max_tokens_to_sample, 1024);
        assert_eq!(config.generation.temperature, 0.3);
        assert_eq!(config.knowledge_base_path, PathBuf::from("knowledgebase.md"));
    }

    #[test]
    fn ollama_requires_model_but_not_key() {
        let err = Config::from_lookup(lookup(&[("COMPLETION_PROVIDER", "ollama")])).unwrap_err();
        assert!(err.to_string().contains("OLLAMA_MODEL"));

        let config = Config::from_lookup(lookup(&[
            ("COMPLETION_PROVIDER", "Ollama"),
            ("OLLAMA_MODEL", "llama3"),
        ]))
        .unwrap();
        assert_eq!(
            config.provider,
            ProviderConfig::Ollama {
                api_key: None,
                base_url: DEFAULT_OLLAMA_URL.into(),
            }
        );
        assert_eq!(config.generation.model, "llama3");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("COMPLETION_PROVIDER", "openai"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ]))
        .unwrap_err();
        assert!(matches!(err, QueryError::Configuration(_)));
    }

    #[test]
    fn generation_overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("MAX_TOKENS_TO_SAMPLE", "256"),
            ("TEMPERATURE", "0.0"),
            ("KNOWLEDGE_BASE_PATH", "/var/task/kb.md"),
        ]))
        .unwrap();
        assert_eq!(config.generation.max_tokens_to_sample, 256);
        assert_eq!(config.generation.temperature, 0.0);
        assert_eq!(config.knowledge_base_path, PathBuf::from("/var/task/kb.md"));

        let err = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("TEMPERATURE", "warm"),
        ]))
        .unwrap_err();
        assert!(matches!(err, QueryError::Configuration(_)));
    }
}
