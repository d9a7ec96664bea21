use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumIter};
use url::Url;

use super::error::{ToolError, ToolResult};
use super::graph::{MockGraphTool, Neo4jConfig, Neo4jGraphTool};
use super::search::{MockSearchTool, ModelSearchTool};
use super::ToolAdapter;
use crate::config::TagVocabulary;
use crate::providers::base::Provider;

#[derive(EnumIter, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ToolType {
    Search,
    Graph,
}

/// How to build the tool a research session dispatches to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolConfig {
    MockSearch,
    ModelSearch {
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
    },
    MockGraph,
    Neo4j {
        uri: String,
        username: String,
        password: String,
        #[serde(default = "default_database")]
        database: String,
    },
}

fn default_database() -> String {
    "neo4j".to_string()
}

impl ToolConfig {
    pub fn tool_type(&self) -> ToolType {
        match self {
            ToolConfig::MockSearch | ToolConfig::ModelSearch { .. } => ToolType::Search,
            ToolConfig::MockGraph | ToolConfig::Neo4j { .. } => ToolType::Graph,
        }
    }
}

/// Build a tool; `provider` backs the model-mocked search engine, which hides
/// reasoning using the session's `tags`
pub fn get_tool(
    config: ToolConfig,
    provider: Arc<dyn Provider>,
    tags: &TagVocabulary,
) -> ToolResult<Box<dyn ToolAdapter>> {
    match config {
        ToolConfig::MockSearch => Ok(Box::new(MockSearchTool::new())),
        ToolConfig::ModelSearch { model, temperature } => Ok(Box::new(
            ModelSearchTool::new(provider, model)
                .with_temperature(temperature)
                .with_annotation(tags.annotation()),
        )),
        ToolConfig::MockGraph => Ok(Box::new(MockGraphTool::new())),
        ToolConfig::Neo4j {
            uri,
            username,
            password,
            database,
        } => {
            let parsed = Url::parse(&uri)
                .map_err(|e| ToolError::InvalidParameters(format!("bad Neo4j uri {}: {}", uri, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ToolError::InvalidParameters(format!(
                    "Neo4j is reached over its HTTP API, got scheme {}",
                    parsed.scheme()
                )));
            }
            let config = Neo4jConfig::new(uri, username, password).with_database(database);
            Ok(Box::new(Neo4jGraphTool::new(config)?))
        }
    }
}
