use async_trait::async_trait;
use indoc::formatdoc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{require_text, ToolError, ToolResult};
use super::{failure_text, ToolAdapter};
use crate::models::directive::DirectiveKind;

fn result_block(body: &str) -> String {
    format!("```result\n{}\n```", body)
}

/// A graph database stand-in returning a fixed shape for any query
#[derive(Debug, Clone, Default)]
pub struct MockGraphTool;

impl MockGraphTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolAdapter for MockGraphTool {
    fn name(&self) -> &str {
        "graph"
    }

    fn directive(&self) -> DirectiveKind {
        DirectiveKind::GraphQuery
    }

    async fn execute(&self, directive: &str) -> String {
        match require_text(directive) {
            Ok(query) => result_block(&formatdoc! {"
                Query: {query}

                Mock Results:
                [Node1] -> relationship -> [Node2]
                [Node2] -> relationship -> [Node3]"
            }),
            Err(e) => failure_text(self.name(), &e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    /// Base HTTP URI, e.g. `http://localhost:7474`
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Neo4jConfig {
    pub fn new(
        uri: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            username: username.into(),
            password: password.into(),
            database: "neo4j".to_string(),
        }
    }

    pub fn with_database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = database.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    code: String,
    message: String,
}

/// Runs Cypher against a Neo4j server through its transactional HTTP endpoint
pub struct Neo4jGraphTool {
    client: Client,
    config: Neo4jConfig,
}

impl Neo4jGraphTool {
    pub fn new(config: Neo4jConfig) -> ToolResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, config })
    }

    async fn run_query(&self, query: &str) -> ToolResult<String> {
        let query = require_text(query)?;
        let url = format!(
            "{}/db/{}/tx/commit",
            self.config.uri.trim_end_matches('/'),
            self.config.database
        );
        debug!(url = %url, "running cypher");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&json!({ "statements": [{ "statement": query }] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionError(format!(
                "Request failed: {}\nBody: {}",
                status, body
            )));
        }

        let body: CommitResponse = response.json().await?;
        if let Some(error) = body.errors.first() {
            return Err(ToolError::ExecutionError(format!(
                "{}: {}",
                error.code, error.message
            )));
        }

        Ok(result_block(&format_records(&body.results)))
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn format_records(results: &[StatementResult]) -> String {
    let rows: usize = results.iter().map(|r| r.data.len()).sum();
    if rows == 0 {
        return "No records matched.".to_string();
    }

    let mut lines = Vec::new();
    for result in results {
        lines.push(result.columns.join(" | "));
        for record in &result.data {
            lines.push(
                record
                    .row
                    .iter()
                    .map(format_value)
                    .collect::<Vec<_>>()
                    .join(" | "),
            );
        }
    }
    lines.join("\n")
}

#[async_trait]
impl ToolAdapter for Neo4jGraphTool {
    fn name(&self) -> &str {
        "graph"
    }

    fn directive(&self) -> DirectiveKind {
        DirectiveKind::GraphQuery
    }

    async fn execute(&self, directive: &str) -> String {
        match self.run_query(directive).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = self.name(), error = %e, "graph query failed");
                failure_text(self.name(), &e)
            }
        }
    }
}
