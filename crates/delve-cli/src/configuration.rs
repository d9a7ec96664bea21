use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File};
use delve::config::{SessionConfig, TagVocabulary, DEFAULT_MAX_STEPS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use delve::providers::configs::{
    AzureInferenceProviderConfig, OpenAiProviderConfig, ProviderConfig, AZURE_API_VERSION,
    DEEPSEEK_HOST, OLLAMA_HOST, OPENAI_HOST,
};
use delve::providers::factory::ProviderType;
use delve::tools::factory::{ToolConfig, ToolType};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    DeepSeek {
        #[serde(default = "default_deepseek_host")]
        host: String,
        api_key: String,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
    },
    Azure {
        endpoint: String,
        api_key: String,
        #[serde(default = "default_api_version")]
        api_version: String,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. }
            | ProviderSettings::DeepSeek { .. }
            | ProviderSettings::Ollama { .. } => ProviderType::OpenAi,
            ProviderSettings::Azure { .. } => ProviderType::Azure,
        }
    }

    // Convert to the delve ProviderConfig
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi { host, api_key } => {
                ProviderConfig::OpenAi(OpenAiProviderConfig::new(host, api_key))
            }
            ProviderSettings::DeepSeek { host, api_key } => {
                ProviderConfig::OpenAi(OpenAiProviderConfig::new(host, Some(api_key)))
            }
            ProviderSettings::Ollama { host } => {
                ProviderConfig::OpenAi(OpenAiProviderConfig::new(host, None))
            }
            ProviderSettings::Azure {
                endpoint,
                api_key,
                api_version,
            } => ProviderConfig::Azure(AzureInferenceProviderConfig {
                endpoint,
                api_key,
                api_version,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ToolSettings {
    Search {
        /// Model asked to invent search results; the session model when unset
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        mock: bool,
    },
    Graph {
        /// Neo4j HTTP endpoint; the mock graph is used when unset
        #[serde(default)]
        uri: Option<String>,
        #[serde(default = "default_neo4j_username")]
        username: String,
        #[serde(default)]
        password: Option<String>,
        #[serde(default = "default_neo4j_database")]
        database: String,
    },
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::for_type(ToolType::Search)
    }
}

impl ToolSettings {
    pub fn for_type(tool_type: ToolType) -> Self {
        match tool_type {
            ToolType::Search => ToolSettings::Search {
                model: None,
                mock: false,
            },
            ToolType::Graph => ToolSettings::Graph {
                uri: None,
                username: default_neo4j_username(),
                password: None,
                database: default_neo4j_database(),
            },
        }
    }

    pub fn tool_type(&self) -> ToolType {
        match self {
            ToolSettings::Search { .. } => ToolType::Search,
            ToolSettings::Graph { .. } => ToolType::Graph,
        }
    }

    /// Resolve to a tool config; `force_mock` swaps every backend for its mock
    pub fn into_config(self, session: &SessionSettings, force_mock: bool) -> Result<ToolConfig, ConfigError> {
        match self {
            ToolSettings::Search { mock, .. } if mock || force_mock => Ok(ToolConfig::MockSearch),
            ToolSettings::Search { model, .. } => Ok(ToolConfig::ModelSearch {
                model: model.unwrap_or_else(|| session.model.clone()),
                temperature: session.temperature,
            }),
            ToolSettings::Graph { uri: None, .. } => Ok(ToolConfig::MockGraph),
            ToolSettings::Graph { .. } if force_mock => Ok(ToolConfig::MockGraph),
            ToolSettings::Graph {
                uri: Some(uri),
                username,
                password,
                database,
            } => {
                let password = password.ok_or_else(|| ConfigError::MissingEnvVar {
                    env_var: to_env_var("tool.password"),
                })?;
                Ok(ToolConfig::Neo4j {
                    uri,
                    username,
                    password,
                    database,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub retain_reasoning: bool,
    #[serde(default)]
    pub tags: TagVocabulary,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_steps: default_max_steps(),
            retain_reasoning: false,
            tags: TagVocabulary::default(),
        }
    }
}

impl SessionSettings {
    pub fn into_config(self) -> SessionConfig {
        SessionConfig {
            retain_reasoning: self.retain_reasoning,
            ..SessionConfig::new(self.model)
                .with_temperature(self.temperature)
                .with_max_steps(Some(self.max_steps))
                .with_tags(self.tags)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub tool: ToolSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("tool.type", "search")?
            // Optional delve.toml in the working directory
            .add_source(File::with_name("delve").required(false))
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("DELVE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if let Some(field) = missing_field(&error_str) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

/// Dotted path of the field named in a "missing field `x` [for key `y`]" message
fn missing_field(message: &str) -> Option<String> {
    let rest = &message[message.find("missing field `")? + "missing field `".len()..];
    let field = &rest[..rest.find('`')?];
    let field = match field {
        // a missing section needs its `type` first
        "provider" => "provider.type",
        other => other,
    };

    let parent = message
        .find("for key `")
        .map(|i| &message[i + "for key `".len()..])
        .and_then(|rest| rest.find('`').map(|end| &rest[..end]))
        .filter(|parent| !parent.is_empty());

    Some(match parent {
        Some(parent) => format!("{}.{}", parent, field),
        None if field == "type" => "provider.type".to_string(),
        None => field.to_string(),
    })
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> Option<f32> {
    Some(DEFAULT_TEMPERATURE)
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_deepseek_host() -> String {
    DEEPSEEK_HOST.to_string()
}

fn default_ollama_host() -> String {
    OLLAMA_HOST.to_string()
}

fn default_api_version() -> String {
    AZURE_API_VERSION.to_string()
}

fn default_neo4j_username() -> String {
    "neo4j".to_string()
}

fn default_neo4j_database() -> String {
    "neo4j".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("DELVE_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("DELVE_PROVIDER__TYPE", "deepseek");
        env::set_var("DELVE_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        if let ProviderSettings::DeepSeek { host, api_key } = &settings.provider {
            assert_eq!(host, "https://api.deepseek.com");
            assert_eq!(api_key, "test-key");
        } else {
            panic!("Expected DeepSeek provider");
        }
        assert_eq!(settings.provider.provider_type(), ProviderType::OpenAi);
        assert_eq!(settings.tool, ToolSettings::default());
        assert_eq!(settings.session, SessionSettings::default());
        assert_eq!(settings.session.model, "deepseek-reasoner");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_azure_settings() {
        clean_env();
        env::set_var("DELVE_PROVIDER__TYPE", "azure");
        env::set_var("DELVE_PROVIDER__ENDPOINT", "https://example.services.ai.azure.com/models");
        env::set_var("DELVE_PROVIDER__API_KEY", "azure-key");
        env::set_var("DELVE_SESSION__MODEL", "DeepSeek-R1");
        env::set_var("DELVE_SESSION__TEMPERATURE", "0.7");
        env::set_var("DELVE_SESSION__MAX_STEPS", "8");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.provider.provider_type(), ProviderType::Azure);
        assert_eq!(settings.session.model, "DeepSeek-R1");
        assert_eq!(settings.session.temperature, Some(0.7));
        assert_eq!(settings.session.max_steps, 8);

        match settings.provider.into_config() {
            ProviderConfig::Azure(config) => {
                assert_eq!(config.endpoint, "https://example.services.ai.azure.com/models");
                assert_eq!(config.api_version, AZURE_API_VERSION);
            }
            _ => panic!("Expected Azure provider"),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_graph_tool_settings() {
        clean_env();
        env::set_var("DELVE_PROVIDER__TYPE", "ollama");
        env::set_var("DELVE_TOOL__TYPE", "graph");
        env::set_var("DELVE_TOOL__URI", "http://localhost:7474");
        env::set_var("DELVE_TOOL__PASSWORD", "secret");

        let settings = Settings::new().unwrap();
        let session = settings.session.clone();
        let tool = settings.tool.clone().into_config(&session, false).unwrap();
        assert_eq!(
            tool,
            ToolConfig::Neo4j {
                uri: "http://localhost:7474".to_string(),
                username: "neo4j".to_string(),
                password: "secret".to_string(),
                database: "neo4j".to_string(),
            }
        );

        // mock forced from the command line
        let tool = settings.tool.into_config(&session, true).unwrap();
        assert_eq!(tool, ToolConfig::MockGraph);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_provider_type() {
        clean_env();
        env::set_var("DELVE_PROVIDER__API_KEY", "test-key");

        let err = Settings::new().unwrap_err();
        match err {
            ConfigError::MissingEnvVar { env_var } => {
                assert!(env_var.starts_with("DELVE_"));
                assert!(env_var.ends_with("TYPE"));
            }
            other => panic!("Expected MissingEnvVar, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    fn test_search_tool_resolution() {
        let session = SessionSettings::default();

        let tool = ToolSettings::default().into_config(&session, false).unwrap();
        assert_eq!(
            tool,
            ToolConfig::ModelSearch {
                model: "deepseek-reasoner".to_string(),
                temperature: Some(0.5),
            }
        );

        let tool = ToolSettings::Search {
            model: Some("deepseek-chat".to_string()),
            mock: true,
        }
        .into_config(&session, false)
        .unwrap();
        assert_eq!(tool, ToolConfig::MockSearch);

        let err = ToolSettings::Graph {
            uri: Some("http://localhost:7474".to_string()),
            username: "neo4j".to_string(),
            password: None,
            database: "neo4j".to_string(),
        }
        .into_config(&session, false)
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar { ref env_var } if env_var == "DELVE_TOOL__PASSWORD"));
    }

    #[test]
    fn test_missing_field_paths() {
        assert_eq!(
            missing_field("missing field `api_key` for key `provider`").as_deref(),
            Some("provider.api_key")
        );
        assert_eq!(missing_field("missing field `type`").as_deref(), Some("provider.type"));
        assert_eq!(missing_field("missing field `provider`").as_deref(), Some("provider.type"));
        assert_eq!(missing_field("invalid type: string").as_deref(), None);
    }

    #[test]
    fn test_session_settings_into_config() {
        let config = SessionSettings {
            retain_reasoning: true,
            ..Default::default()
        }
        .into_config();
        assert_eq!(config.model, "deepseek-reasoner");
        assert_eq!(config.max_steps, Some(20));
        assert!(config.retain_reasoning);
        assert!(config.validate().is_ok());
    }
}
