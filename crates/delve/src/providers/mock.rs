use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream;
use std::sync::Arc;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::providers::base::{Chunk, ChunkStream, CompletionRequest, FinishReason, Provider};

/// A mock provider that streams pre-configured turns for testing
#[derive(Clone, Default)]
pub struct MockProvider {
    turns: Arc<Mutex<Vec<Vec<Chunk>>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of turns, each a list of chunks
    pub fn new(turns: Vec<Vec<Chunk>>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns)),
            requests: Arc::default(),
        }
    }

    /// One single-chunk turn per text, each ending with a `stop` finish
    pub fn with_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|text| vec![Chunk::text(text.as_ref()).with_finish_reason(FinishReason::Stop)])
                .collect(),
        )
    }

    /// The transcripts received so far, in call order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn stream(&self, request: &CompletionRequest<'_>) -> Result<ChunkStream> {
        self.requests
            .lock()
            .map_err(|_| anyhow!("mock provider lock poisoned"))?
            .push(request.messages.to_vec());

        let mut turns = self
            .turns
            .lock()
            .map_err(|_| anyhow!("mock provider lock poisoned"))?;
        // An exhausted script streams an empty turn
        let chunks = if turns.is_empty() {
            Vec::new()
        } else {
            turns.remove(0)
        };
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}
