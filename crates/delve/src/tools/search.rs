use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::error::{require_text, ToolError, ToolResult};
use super::{failure_text, ToolAdapter};
use crate::config::TagPair;
use crate::models::directive::DirectiveKind;
use crate::models::message::Message;
use crate::prompt_template::{mock_search_prompt, MOCK_SEARCH_RESULTS};
use crate::providers::base::{CompletionRequest, Provider};
use crate::scanner::{ScannerOptions, TagScanner};
use crate::turn::{drain_turn, NullObserver};

const SNIPPETS: [&str; MOCK_SEARCH_RESULTS] = [
    "An overview of {q} published this quarter summarises the main facts, recent figures and the open questions analysts are still debating.",
    "A regulatory filing touching on {q} lists the disclosed risks alongside the reporting period and the parties involved.",
    "An industry survey covering {q} compares the leading positions and notes where the available data is thin or contested.",
    "A critical commentary on {q} argues the consensus view underestimates several risks and cites two independent studies.",
    "Recent news about {q} reports a development from the last month and quotes reactions from market participants.",
];

/// Render search results in the fenced layout the research prompts expect
pub fn format_results<S: AsRef<str>>(snippets: &[S]) -> String {
    snippets
        .iter()
        .enumerate()
        .map(|(i, snippet)| format!("```search {}\n{}\n```", i + 1, snippet.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A deterministic search engine returning templated snippets for a query
#[derive(Debug, Clone, Default)]
pub struct MockSearchTool;

impl MockSearchTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolAdapter for MockSearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn directive(&self) -> DirectiveKind {
        DirectiveKind::SearchQuery
    }

    async fn execute(&self, directive: &str) -> String {
        match require_text(directive) {
            Ok(query) => {
                let snippets: Vec<String> =
                    SNIPPETS.iter().map(|s| s.replace("{q}", query)).collect();
                format_results(&snippets)
            }
            Err(e) => failure_text(self.name(), &e),
        }
    }
}

/// A search engine mocked by asking a model to invent plausible results
pub struct ModelSearchTool {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: Option<f32>,
    annotation: TagPair,
}

impl ModelSearchTool {
    pub fn new<S: Into<String>>(provider: Arc<dyn Provider>, model: S) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            annotation: TagPair::named("think"),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_annotation(mut self, annotation: TagPair) -> Self {
        self.annotation = annotation;
        self
    }

    async fn search(&self, query: &str) -> ToolResult<String> {
        let query = require_text(query)?;
        let messages = vec![Message::system(mock_search_prompt()?), Message::user(query)];
        let request = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            stop: &[],
        };

        let stream = self
            .provider
            .stream(&request)
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        // the mocker's own reasoning never reaches the research transcript
        let mut scanner = TagScanner::new(
            self.annotation.clone(),
            ScannerOptions {
                retain_annotated: false,
                echo: false,
            },
        );
        let turn = drain_turn(stream, &mut scanner, &NullObserver)
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        let results = turn.retained.trim();
        if results.is_empty() {
            return Err(ToolError::ExecutionError(
                "the search backend returned no results".to_string(),
            ));
        }
        Ok(results.to_string())
    }
}

#[async_trait]
impl ToolAdapter for ModelSearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn directive(&self) -> DirectiveKind {
        DirectiveKind::SearchQuery
    }

    async fn execute(&self, directive: &str) -> String {
        match self.search(directive).await {
            Ok(results) => results,
            Err(e) => {
                warn!(tool = self.name(), error = %e, "search failed");
                failure_text(self.name(), &e)
            }
        }
    }
}
