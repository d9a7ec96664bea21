pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const DEEPSEEK_HOST: &str = "https://api.deepseek.com";
pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const AZURE_API_VERSION: &str = "2024-05-01-preview";

// Unified enum to wrap different provider configurations
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Azure(AzureInferenceProviderConfig),
}

/// Any host speaking the OpenAI chat completions protocol
pub struct OpenAiProviderConfig {
    pub host: String,
    /// Bearer token; local hosts such as Ollama need none
    pub api_key: Option<String>,
}

impl OpenAiProviderConfig {
    pub fn new<S: Into<String>>(host: S, api_key: Option<String>) -> Self {
        Self {
            host: host.into(),
            api_key,
        }
    }
}

/// An Azure AI Inference deployment
pub struct AzureInferenceProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

impl AzureInferenceProviderConfig {
    pub fn new<E: Into<String>, K: Into<String>>(endpoint: E, api_key: K) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: AZURE_API_VERSION.to_string(),
        }
    }
}
