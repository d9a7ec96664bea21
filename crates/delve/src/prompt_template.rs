use include_dir::{include_dir, Dir};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tera::{Context, Error as TeraError, Tera};

use crate::config::TagVocabulary;
use crate::errors::AgentResult;
use crate::models::directive::DirectiveKind;

static PROMPTS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/src/prompts");

pub const MOCK_SEARCH_RESULTS: usize = 5;

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render a template read from disk
pub fn load_prompt_file<T: Serialize>(
    template_file: impl AsRef<Path>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_content = fs::read_to_string(template_file.as_ref())
        .map_err(|e| TeraError::chain("Failed to read template file", e))?;
    load_prompt(&template_content, context_data)
}

/// Render one of the prompts embedded in the crate
fn load_builtin_prompt<T: Serialize>(name: &str, context_data: &T) -> Result<String, TeraError> {
    let template_content = PROMPTS_DIR
        .get_file(name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| TeraError::msg(format!("Template not found: {}", name)))?;
    load_prompt(template_content, context_data)
}

#[derive(Serialize)]
struct TagContext<'a> {
    tags: &'a TagVocabulary,
}

/// The system prompt for a session whose tool expects `kind` directives
pub fn system_prompt(kind: DirectiveKind, tags: &TagVocabulary) -> AgentResult<String> {
    let file = match kind {
        DirectiveKind::GraphQuery => "research_graph.md",
        _ => "research_search.md",
    };
    Ok(load_builtin_prompt(file, &TagContext { tags })?)
}

/// A user-supplied system prompt template, rendered with the same tag context
pub fn system_prompt_from_file(path: &Path, tags: &TagVocabulary) -> AgentResult<String> {
    Ok(load_prompt_file(path, &TagContext { tags })?)
}

/// The initial user message: the question plus the one-sub-topic reminder
pub fn steering_prompt(prompt: &str) -> AgentResult<String> {
    let mut context = HashMap::new();
    context.insert("prompt", prompt);
    Ok(load_builtin_prompt("steering.md", &context)?)
}

pub fn mock_search_prompt() -> AgentResult<String> {
    let mut context = HashMap::new();
    context.insert("numbers", (1..=MOCK_SEARCH_RESULTS).collect::<Vec<_>>());
    Ok(load_builtin_prompt("mock_search.md", &context)?)
}
