use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::base::{ChunkStream, CompletionRequest, Provider};
use super::configs::OpenAiProviderConfig;
use super::utils::{check_response, create_request_payload, sse_chunk_stream};

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<reqwest::Response> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let mut request = self.client.post(&url).json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        check_response(request.send().await?).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn stream(&self, request: &CompletionRequest<'_>) -> Result<ChunkStream> {
        let payload = create_request_payload(request);
        let response = self.post(payload).await?;
        Ok(sse_chunk_stream(response))
    }
}
