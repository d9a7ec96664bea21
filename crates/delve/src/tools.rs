//! Tool adapters execute one directive and hand back text for the transcript
use async_trait::async_trait;

use crate::models::directive::DirectiveKind;

pub mod error;
pub mod factory;
pub mod graph;
pub mod search;

use error::ToolError;

/// Core trait for a backend the agent can send directives to
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Get the name of the tool
    fn name(&self) -> &str;

    /// The directive kind this tool services
    fn directive(&self) -> DirectiveKind;

    /// Execute a directive. Failures come back as explanatory text, never errors,
    /// so the loop always has something to feed back to the model.
    async fn execute(&self, directive: &str) -> String;
}

/// Render a tool failure so the model can tell it apart from real results
pub fn failure_text(tool: &str, error: &ToolError) -> String {
    format!(
        "```error\n{} could not service this request: {}\n```",
        tool, error
    )
}

/// Whether a result string came from [`failure_text`]
pub fn is_failure(result: &str) -> bool {
    result.starts_with("```error\n")
}
