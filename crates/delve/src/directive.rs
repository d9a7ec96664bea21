//! Pulls a single tagged directive out of a finished turn
use regex::Regex;
use std::collections::HashMap;
use strum::IntoEnumIterator;

use crate::config::TagVocabulary;
use crate::errors::{AgentError, AgentResult};
use crate::models::directive::{Directive, DirectiveKind};

/// Matches `<tag>...</tag>` for every directive kind of a tag vocabulary.
///
/// Matching is non-greedy and spans newlines. A payload is only returned when
/// its closing tag is present; a turn cut off before its terminator yields
/// [`Directive::None`].
#[derive(Debug, Clone)]
pub struct DirectiveExtractor {
    patterns: HashMap<DirectiveKind, Regex>,
}

impl DirectiveExtractor {
    pub fn new(tags: &TagVocabulary) -> AgentResult<Self> {
        let mut patterns = HashMap::new();
        for kind in DirectiveKind::iter() {
            let pair = tags.directive(kind);
            let pattern = format!(
                "(?s){}(.*?){}",
                regex::escape(&pair.open),
                regex::escape(&pair.close)
            );
            let regex = Regex::new(&pattern).map_err(|e| AgentError::Internal(e.to_string()))?;
            patterns.insert(kind, regex);
        }
        Ok(Self { patterns })
    }

    /// First well-formed directive of `kind` in `text`, trimmed
    pub fn extract(&self, kind: DirectiveKind, text: &str) -> Directive {
        self.patterns
            .get(&kind)
            .and_then(|regex| regex.captures(text))
            .and_then(|captures| captures.get(1))
            .map(|payload| Directive::new(kind, payload.as_str().trim()))
            .unwrap_or(Directive::None)
    }
}
