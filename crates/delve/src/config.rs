use serde::{Deserialize, Serialize};

use crate::errors::{AgentError, AgentResult};
use crate::models::directive::DirectiveKind;

pub const DEFAULT_MODEL: &str = "deepseek-reasoner";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_STEPS: usize = 20;

/// An opening and closing delimiter recognised as literal text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub open: String,
    pub close: String,
}

impl TagPair {
    /// Build the `<name>` / `</name>` pair for a tag name
    pub fn named(name: &str) -> Self {
        Self {
            open: format!("<{}>", name),
            close: format!("</{}>", name),
        }
    }
}

/// The tag names that make up the wire contract with the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagVocabulary {
    pub think: String,
    pub query: String,
    pub cypher: String,
    pub report: String,
}

impl Default for TagVocabulary {
    fn default() -> Self {
        Self {
            think: "think".to_string(),
            query: "query".to_string(),
            cypher: "cypher".to_string(),
            report: "report".to_string(),
        }
    }
}

impl TagVocabulary {
    pub fn annotation(&self) -> TagPair {
        TagPair::named(&self.think)
    }

    pub fn directive(&self, kind: DirectiveKind) -> TagPair {
        match kind {
            DirectiveKind::SearchQuery => TagPair::named(&self.query),
            DirectiveKind::GraphQuery => TagPair::named(&self.cypher),
            DirectiveKind::Report => TagPair::named(&self.report),
        }
    }

    fn validate(&self) -> AgentResult<()> {
        let names = [&self.think, &self.query, &self.cypher, &self.report];
        for name in names {
            let malformed = name.is_empty()
                || name.contains(|c: char| matches!(c, '<' | '>' | '/') || c.is_whitespace());
            if malformed {
                return Err(AgentError::InvalidConfig(format!(
                    "invalid tag name {:?}",
                    name
                )));
            }
        }
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                return Err(AgentError::InvalidConfig(format!(
                    "tag name {:?} is used twice",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Everything a research session needs to talk to the model.
///
/// The loop reads only this value, so two sessions with different configs can
/// run side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub model: String,
    pub temperature: Option<f32>,
    /// Explicit stop sequences; derived from the tag vocabulary when empty
    pub stop_sequences: Vec<String>,
    pub tags: TagVocabulary,
    /// Ceiling on loop iterations, `None` runs until a report or a dead end
    pub max_steps: Option<usize>,
    /// Forward display text to the turn observer while streaming
    pub echo: bool,
    /// Keep reasoning spans in the retained turn text
    pub retain_reasoning: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            stop_sequences: Vec::new(),
            tags: TagVocabulary::default(),
            max_steps: Some(DEFAULT_MAX_STEPS),
            echo: true,
            retain_reasoning: false,
        }
    }
}

impl SessionConfig {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_tags(mut self, tags: TagVocabulary) -> Self {
        self.tags = tags;
        self
    }

    /// Stop sequences sent with every request for a session expecting `kind`
    pub fn stop_sequences_for(&self, kind: DirectiveKind) -> Vec<String> {
        if !self.stop_sequences.is_empty() {
            return self.stop_sequences.clone();
        }
        vec![
            self.tags.directive(kind).close,
            self.tags.directive(DirectiveKind::Report).close,
        ]
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.model.trim().is_empty() {
            return Err(AgentError::InvalidConfig("model must be set".to_string()));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AgentError::InvalidConfig(format!(
                    "temperature {} is outside 0.0..=2.0",
                    temperature
                )));
            }
        }
        if self.max_steps == Some(0) {
            return Err(AgentError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        self.tags.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stop_sequences_follow_expected_directive() {
        let config = SessionConfig::default();
        assert_eq!(
            config.stop_sequences_for(DirectiveKind::SearchQuery),
            vec!["</query>", "</report>"]
        );
        assert_eq!(
            config.stop_sequences_for(DirectiveKind::GraphQuery),
            vec!["</cypher>", "</report>"]
        );
    }

    #[test]
    fn test_explicit_stop_sequences_win() {
        let config = SessionConfig {
            stop_sequences: vec!["STOP".to_string()],
            ..Default::default()
        };
        assert_eq!(config.stop_sequences_for(DirectiveKind::Report), vec!["STOP"]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SessionConfig::default().validate().is_ok());
        assert!(SessionConfig::new("").validate().is_err());
        assert!(SessionConfig::default().with_max_steps(Some(0)).validate().is_err());
        assert!(SessionConfig::default()
            .with_temperature(Some(3.5))
            .validate()
            .is_err());

        let tags = TagVocabulary {
            query: "report".to_string(),
            ..Default::default()
        };
        assert!(SessionConfig::default().with_tags(tags).validate().is_err());

        let tags = TagVocabulary {
            think: "th ink".to_string(),
            ..Default::default()
        };
        assert!(SessionConfig::default().with_tags(tags).validate().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"model": "r1"}"#).unwrap();
        assert_eq!(config.model, "r1");
        assert_eq!(config.max_steps, Some(DEFAULT_MAX_STEPS));
        assert_eq!(config.tags.think, "think");
    }
}
