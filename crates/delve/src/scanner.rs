//! Incremental classification of streamed text into annotation and answer spans
//!
//! A model turn arrives as a sequence of chunks of arbitrary size. The scanner
//! keeps a single "inside annotation" flag and walks every chunk looking for the
//! literal open and close delimiters, deciding for each piece of text whether it
//! belongs to the retained turn text and how it should be displayed.
//!
//! Nesting is not tracked: an open delimiter always moves the scanner inside, a
//! close delimiter always moves it outside, whatever the previous state was.
//!
//! A delimiter may be split across two chunks (`<thi` then `nk>`). The scanner
//! holds back the longest tail of a chunk that could still grow into a
//! delimiter and prepends it to the next chunk, so retained text does not depend
//! on how the stream happened to be chunked.
use crate::config::TagPair;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerOptions {
    /// Keep annotated text in the retained output
    pub retain_annotated: bool,
    /// Produce display segments for live observation
    pub echo: bool,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            retain_annotated: false,
            echo: true,
        }
    }
}

/// A run of display text sharing one classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySegment {
    pub text: String,
    /// The text was inside an annotation span and should render distinctly
    pub annotated: bool,
}

/// What the scanner produced for a single chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub retained: String,
    pub display: Vec<DisplaySegment>,
    /// Annotated text seen in this chunk, whether or not it was retained
    pub annotated: String,
}

impl ScanOutput {
    fn push_display(&mut self, text: &str, annotated: bool) {
        match self.display.last_mut() {
            Some(last) if last.annotated == annotated => last.text.push_str(text),
            _ => self.display.push(DisplaySegment {
                text: text.to_string(),
                annotated,
            }),
        }
    }
}

/// Tag-state scanner for one model turn at a time
#[derive(Debug, Clone)]
pub struct TagScanner {
    delimiters: TagPair,
    options: ScannerOptions,
    inside: bool,
    saw_annotation: bool,
    pending: String,
}

impl TagScanner {
    pub fn new(delimiters: TagPair, options: ScannerOptions) -> Self {
        Self {
            delimiters,
            options,
            inside: false,
            saw_annotation: false,
            pending: String::new(),
        }
    }

    /// Whether the scanner currently sits inside an annotation span
    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// Whether an opening delimiter has been seen since the last reset
    pub fn saw_annotation(&self) -> bool {
        self.saw_annotation
    }

    /// Forget all state, ready for a new turn
    pub fn reset(&mut self) {
        self.inside = false;
        self.saw_annotation = false;
        self.pending.clear();
    }

    /// Classify one chunk against the current state
    pub fn scan(&mut self, chunk: &str) -> ScanOutput {
        let mut out = ScanOutput::default();
        let mut buffer = std::mem::take(&mut self.pending);
        buffer.push_str(chunk);

        let mut rest = buffer.as_str();
        loop {
            match self.next_delimiter(rest) {
                Some((index, opens, len)) => {
                    // text before the delimiter belongs to the state before the toggle
                    self.emit(&rest[..index], &mut out);
                    self.inside = opens;
                    self.saw_annotation |= opens;
                    rest = &rest[index + len..];
                }
                None => {
                    let held = self.partial_delimiter_len(rest);
                    let (ready, held) = rest.split_at(rest.len() - held);
                    self.emit(ready, &mut out);
                    self.pending = held.to_string();
                    break;
                }
            }
        }
        out
    }

    /// Flush any held-back text at stream end and reset for the next turn
    pub fn finish(&mut self) -> ScanOutput {
        let mut out = ScanOutput::default();
        let pending = std::mem::take(&mut self.pending);
        self.emit(&pending, &mut out);
        self.reset();
        out
    }

    fn emit(&self, text: &str, out: &mut ScanOutput) {
        if text.is_empty() {
            return;
        }
        if self.inside {
            out.annotated.push_str(text);
        }
        if !self.inside || self.options.retain_annotated {
            out.retained.push_str(text);
        }
        if self.options.echo {
            out.push_display(text, self.inside);
        }
    }

    /// Earliest delimiter in `text` as (byte index, is_open, delimiter length)
    fn next_delimiter(&self, text: &str) -> Option<(usize, bool, usize)> {
        let open = text
            .find(&self.delimiters.open)
            .map(|i| (i, true, self.delimiters.open.len()));
        let close = text
            .find(&self.delimiters.close)
            .map(|i| (i, false, self.delimiters.close.len()));

        match (open, close) {
            (Some(o), Some(c)) => {
                if o.0 < c.0 || (o.0 == c.0 && o.2 >= c.2) {
                    Some(o)
                } else {
                    Some(c)
                }
            }
            (o, c) => o.or(c),
        }
    }

    /// Length of the longest tail of `text` that is a proper prefix of a delimiter
    fn partial_delimiter_len(&self, text: &str) -> usize {
        [&self.delimiters.open, &self.delimiters.close]
            .into_iter()
            .flat_map(|delimiter| {
                (1..delimiter.len())
                    .filter(|&k| delimiter.is_char_boundary(k))
                    .filter(|&k| text.ends_with(&delimiter[..k]))
                    .max()
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(retain_annotated: bool) -> TagScanner {
        TagScanner::new(
            TagPair::named("think"),
            ScannerOptions {
                retain_annotated,
                echo: true,
            },
        )
    }

    /// Feed all chunks then flush, concatenating the outputs
    fn run(scanner: &mut TagScanner, chunks: &[&str]) -> ScanOutput {
        let mut total = ScanOutput::default();
        for chunk in chunks.iter().copied() {
            let out = scanner.scan(chunk);
            merge(&mut total, out);
        }
        let out = scanner.finish();
        merge(&mut total, out);
        total
    }

    fn merge(total: &mut ScanOutput, out: ScanOutput) {
        total.retained.push_str(&out.retained);
        total.annotated.push_str(&out.annotated);
        for segment in out.display {
            total.push_display(&segment.text, segment.annotated);
        }
    }

    #[test]
    fn test_reasoning_is_excluded_from_retained_text() {
        let out = run(&mut scanner(false), &["A<think>B</think>C"]);
        assert_eq!(out.retained, "AC");
        assert_eq!(out.annotated, "B");
        assert_eq!(
            out.display,
            vec![
                DisplaySegment {
                    text: "A".to_string(),
                    annotated: false
                },
                DisplaySegment {
                    text: "B".to_string(),
                    annotated: true
                },
                DisplaySegment {
                    text: "C".to_string(),
                    annotated: false
                },
            ]
        );
    }

    #[test]
    fn test_reasoning_can_be_retained() {
        let out = run(&mut scanner(true), &["A<think>B</think>C"]);
        assert_eq!(out.retained, "ABC");
        assert!(out.display.iter().any(|s| s.annotated && s.text == "B"));
    }

    #[test]
    fn test_retained_text_is_invariant_under_chunking() {
        let text = "intro <think>plan the first search</think> then <query>solana tps</query> \
                    <think>again</think>tail";
        let whole = run(&mut scanner(false), &[text]).retained;
        assert_eq!(whole, "intro  then <query>solana tps</query> tail");

        // every two-way split, including ones that cut through a delimiter
        for i in 1..text.len() {
            let (a, b) = text.split_at(i);
            let out = run(&mut scanner(false), &[a, b]);
            assert_eq!(out.retained, whole, "split at {}", i);
        }

        // single characters
        let chars: Vec<String> = text.chars().map(String::from).collect();
        let pieces: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(run(&mut scanner(false), &pieces).retained, whole);
    }

    #[test]
    fn test_split_delimiter_is_recognised() {
        let mut s = scanner(false);
        let first = s.scan("a<thi");
        assert_eq!(first.retained, "a");
        assert!(!s.is_inside());

        let second = s.scan("nk>hidden</th");
        assert_eq!(second.retained, "");
        assert_eq!(second.annotated, "hidden");
        assert!(s.is_inside());

        let third = s.scan("ink>b");
        assert_eq!(third.retained, "b");
        assert!(!s.is_inside());
    }

    #[test]
    fn test_held_prefix_that_never_completes_is_kept() {
        let out = run(&mut scanner(false), &["x <", "b> <th", "ought"]);
        assert_eq!(out.retained, "x <b> <thought");

        // a dangling prefix at stream end is flushed as ordinary text
        let out = run(&mut scanner(false), &["done <thi"]);
        assert_eq!(out.retained, "done <thi");
    }

    #[test]
    fn test_malformed_nesting_is_tolerated() {
        // open while inside stays inside
        let out = run(&mut scanner(false), &["a<think>b<think>c</think>d"]);
        assert_eq!(out.retained, "ad");

        // stray close while outside stays outside
        let out = run(&mut scanner(false), &["a</think>b"]);
        assert_eq!(out.retained, "ab");

        // open without close hides the remainder
        let out = run(&mut scanner(false), &["a<think>b", "c"]);
        assert_eq!(out.retained, "a");
        assert_eq!(out.annotated, "bc");
    }

    #[test]
    fn test_state_does_not_leak_between_turns() {
        let mut s = scanner(false);
        run(&mut s, &["<think>unterminated"]);
        assert!(!s.is_inside());
        assert!(!s.saw_annotation());

        let out = run(&mut s, &["visible"]);
        assert_eq!(out.retained, "visible");
    }

    #[test]
    fn test_echo_off_produces_no_display() {
        let mut s = TagScanner::new(
            TagPair::named("think"),
            ScannerOptions {
                retain_annotated: false,
                echo: false,
            },
        );
        let out = s.scan("A<think>B</think>C");
        assert!(out.display.is_empty());
        assert_eq!(out.retained, "AC");
    }

    #[test]
    fn test_multibyte_text_around_delimiters() {
        let text = "prix 🚀<think>réflexion</think>fin—ok";
        let whole = run(&mut scanner(false), &[text]).retained;
        assert_eq!(whole, "prix 🚀fin—ok");

        for (i, _) in text.char_indices().skip(1) {
            let (a, b) = text.split_at(i);
            assert_eq!(run(&mut scanner(false), &[a, b]).retained, whole);
        }
    }

    #[test]
    fn test_saw_annotation_tracks_open_delimiter() {
        let mut s = scanner(false);
        s.scan("plain");
        assert!(!s.saw_annotation());
        s.scan("<think>x");
        assert!(s.saw_annotation());
    }
}
