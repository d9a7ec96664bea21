use anyhow::{anyhow, Result};
use futures::StreamExt;
use reqwest::{Response, StatusCode};
use serde_json::{json, Map, Value};

use super::base::{Chunk, ChunkStream, CompletionRequest, FinishReason};
use crate::models::message::Message;

/// Convert transcript messages to the OpenAI chat message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role,
                "content": message.content,
            })
        })
        .collect()
}

/// Build a streaming chat completions payload
pub fn create_request_payload(request: &CompletionRequest<'_>) -> Value {
    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(request.model));
    payload.insert(
        "messages".to_string(),
        json!(messages_to_openai_spec(request.messages)),
    );
    payload.insert("stream".to_string(), json!(true));

    if let Some(temp) = request.temperature {
        payload.insert("temperature".to_string(), json!(temp));
    }
    if !request.stop.is_empty() {
        payload.insert("stop".to_string(), json!(request.stop));
    }
    Value::Object(payload)
}

/// Turn a non-success HTTP status into an error carrying the response body
pub async fn check_response(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::OK => Ok(response),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
            Err(anyhow!("Server error: {}", status))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(anyhow!("Request failed: {}\nBody: {}", status, body))
        }
    }
}

/// Splits a server-sent event byte stream into `data:` payloads.
///
/// Bytes are buffered until a full line is available, so a multi-byte
/// character or an event cut across network reads is reassembled first.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed raw bytes, returning the data of every event completed by them
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(is_line_end);
            if let Some(event) = self.handle_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever remains when the byte stream ends
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let mut events = Vec::new();
        let line = rest.trim_end_matches(is_line_end);
        if let Some(event) = self.handle_line(line) {
            events.push(event);
        }
        if !self.data.is_empty() {
            events.push(self.data.drain(..).collect::<Vec<_>>().join("\n"));
        }
        events
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            // blank line dispatches the pending event
            if self.data.is_empty() {
                return None;
            }
            return Some(self.data.drain(..).collect::<Vec<_>>().join("\n"));
        }
        if let Some(data) = line.strip_prefix("data:") {
            self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
        // comments, event names and ids carry nothing we use
        None
    }
}

fn is_line_end(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Parse one streamed event; `Ok(None)` marks the end of the stream
pub fn parse_stream_data(data: &str) -> Result<Option<Chunk>> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(None);
    }
    if data.is_empty() {
        return Ok(Some(Chunk::empty()));
    }

    let value: Value = serde_json::from_str(data)?;
    if let Some(error) = value.get("error") {
        return Err(anyhow!("Streaming API error: {}", error));
    }

    let Some(choice) = value
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    else {
        // usage-only or keep-alive events have no choices
        return Ok(Some(Chunk::empty()));
    };

    let content = choice
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
        .map(String::from);
    let finish_reason = choice
        .get("finish_reason")
        .and_then(|r| r.as_str())
        .map(FinishReason::from_wire);

    Ok(Some(Chunk {
        content,
        finish_reason,
    }))
}

/// Adapt a streaming HTTP response into a stream of chunks
pub fn sse_chunk_stream(response: Response) -> ChunkStream {
    let mut bytes = Box::pin(response.bytes_stream());
    Box::pin(async_stream::try_stream! {
        let mut decoder = SseDecoder::default();
        let mut done = false;
        while !done {
            let Some(read) = bytes.next().await else {
                break;
            };
            let read = read.map_err(anyhow::Error::from)?;
            for data in decoder.feed(&read) {
                match parse_stream_data(&data)? {
                    Some(chunk) => yield chunk,
                    None => {
                        done = true;
                        break;
                    }
                }
            }
        }
        if !done {
            for data in decoder.finish() {
                match parse_stream_data(&data)? {
                    Some(chunk) => yield chunk,
                    None => break,
                }
            }
        }
    })
}
