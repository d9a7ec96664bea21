use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

impl From<crate::errors::AgentError> for ToolError {
    fn from(err: crate::errors::AgentError) -> Self {
        ToolError::Internal(err.to_string())
    }
}

/// Reject blank directive text before it reaches a backend
pub fn require_text(directive: &str) -> ToolResult<&str> {
    let text = directive.trim();
    if text.is_empty() {
        return Err(ToolError::InvalidParameters(
            "the directive was empty".to_string(),
        ));
    }
    Ok(text)
}
