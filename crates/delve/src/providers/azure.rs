use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::base::{ChunkStream, CompletionRequest, Provider};
use super::configs::AzureInferenceProviderConfig;
use super::utils::{check_response, create_request_payload, sse_chunk_stream};

/// Azure AI Inference chat completions, as used for hosted DeepSeek-R1 deployments
pub struct AzureInferenceProvider {
    client: Client,
    config: AzureInferenceProviderConfig,
}

impl AzureInferenceProvider {
    pub fn new(config: AzureInferenceProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<reqwest::Response> {
        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .query(&[("api-version", self.config.api_version.as_str())])
            .header("api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        check_response(response).await
    }
}

#[async_trait]
impl Provider for AzureInferenceProvider {
    async fn stream(&self, request: &CompletionRequest<'_>) -> Result<ChunkStream> {
        let payload = create_request_payload(request);
        let response = self.post(payload).await?;
        Ok(sse_chunk_stream(response))
    }
}
