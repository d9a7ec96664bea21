use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;

/// Why the model stopped producing a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of the turn or a stop sequence matched
    Stop,
    /// The token limit cut the turn short
    Length,
    Other,
}

impl FinishReason {
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            _ => FinishReason::Other,
        }
    }
}

/// One fragment of a streamed model turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

impl Chunk {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            content: Some(text.into()),
            finish_reason: None,
        }
    }

    /// A chunk carrying nothing, such as a choice-less keep-alive
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn finished(reason: FinishReason) -> Self {
        Self {
            content: None,
            finish_reason: Some(reason),
        }
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }
}

pub type ChunkStream = BoxStream<'static, Result<Chunk>>;

/// Parameters for one streamed completion
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub temperature: Option<f32>,
    pub stop: &'a [String],
}

/// Base trait for inference transports (OpenAI compatible hosts, Azure, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open a streamed completion over the given transcript
    async fn stream(&self, request: &CompletionRequest<'_>) -> Result<ChunkStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_from_wire() {
        assert_eq!(FinishReason::from_wire("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_wire("length"), FinishReason::Length);
        assert_eq!(FinishReason::from_wire("content_filter"), FinishReason::Other);
    }

    #[test]
    fn test_chunk_serialization() -> Result<()> {
        let chunk = Chunk::text("hi").with_finish_reason(FinishReason::Stop);
        let value = serde_json::to_value(&chunk)?;
        assert_eq!(value["content"], "hi");
        assert_eq!(value["finish_reason"], "stop");

        let back: Chunk = serde_json::from_value(value)?;
        assert_eq!(back, chunk);
        Ok(())
    }
}
