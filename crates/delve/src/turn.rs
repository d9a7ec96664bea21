use anyhow::Result;
use futures::StreamExt;
use tracing::debug;

use crate::providers::base::{ChunkStream, FinishReason};
use crate::scanner::{DisplaySegment, ScanOutput, TagScanner};

/// Receives display text synchronously while a turn streams
pub trait TurnObserver: Send + Sync {
    fn on_segment(&self, segment: &DisplaySegment);

    /// Called once after the last chunk of a turn
    fn on_turn_end(&self) {}
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl TurnObserver for NullObserver {
    fn on_segment(&self, _segment: &DisplaySegment) {}
}

/// One fully drained model response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turn {
    /// Text kept for the transcript and directive extraction
    pub retained: String,
    /// Text for interactive observation, classified per segment
    pub display: Vec<DisplaySegment>,
    /// Everything seen inside annotation spans
    pub reasoning: String,
    /// An opening annotation delimiter was seen, even if the span was empty
    pub saw_reasoning: bool,
    pub finish_reason: Option<FinishReason>,
}

impl Turn {
    /// The trimmed reasoning text, present whenever a span was opened
    pub fn reasoning(&self) -> Option<&str> {
        self.saw_reasoning.then(|| self.reasoning.trim())
    }

    /// Put back a closing tag the transport swallowed as a stop sequence.
    ///
    /// Only applies when the stream reported a `stop` finish and the retained
    /// text ends inside an unterminated `<tag>` whose `</tag>` is one of `stops`.
    /// Returns the restored sequence.
    pub fn restore_stop_sequence(&mut self, stops: &[String]) -> Option<String> {
        if self.finish_reason != Some(FinishReason::Stop) {
            return None;
        }

        let restored = stops
            .iter()
            .filter_map(|stop| {
                let name = stop.strip_prefix("</")?.strip_suffix('>')?;
                let open = format!("<{}>", name);
                let start = self.retained.rfind(&open)?;
                let after = &self.retained[start + open.len()..];
                (!after.contains(stop.as_str())).then_some((start, stop))
            })
            // the innermost unterminated tag is the one being written
            .max_by_key(|(start, _)| *start)
            .map(|(_, stop)| stop.clone())?;

        self.retained.push_str(&restored);
        Some(restored)
    }

    fn absorb(&mut self, out: ScanOutput, observer: &dyn TurnObserver) {
        self.retained.push_str(&out.retained);
        self.reasoning.push_str(&out.annotated);
        for segment in out.display {
            observer.on_segment(&segment);
            match self.display.last_mut() {
                Some(last) if last.annotated == segment.annotated => {
                    last.text.push_str(&segment.text)
                }
                _ => self.display.push(segment),
            }
        }
    }
}

/// Drain a chunk stream through the scanner into a complete turn.
///
/// Chunks are classified as they arrive and display segments are forwarded to
/// the observer before the next chunk is awaited. Empty chunks are skipped.
pub async fn drain_turn(
    mut stream: ChunkStream,
    scanner: &mut TagScanner,
    observer: &dyn TurnObserver,
) -> Result<Turn> {
    scanner.reset();
    let mut turn = Turn::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.finish_reason.is_some() {
            turn.finish_reason = chunk.finish_reason;
        }
        let Some(text) = chunk.content.as_deref().filter(|text| !text.is_empty()) else {
            continue;
        };
        let out = scanner.scan(text);
        turn.absorb(out, observer);
    }

    if scanner.is_inside() {
        debug!("turn ended inside an unterminated reasoning span");
    }
    // finish() resets the scanner
    turn.saw_reasoning = scanner.saw_annotation();
    let out = scanner.finish();
    turn.absorb(out, observer);
    observer.on_turn_end();
    Ok(turn)
}
