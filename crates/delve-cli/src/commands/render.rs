use anyhow::{Context, Result};
use clap::ValueEnum;
use delve::visualization::{PathRenderer, ResearchSnapshot};
use std::fs;
use std::path::Path;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Mermaid,
    Json,
}

/// Re-render a snapshot written by a previous research session
pub fn render_snapshot(snapshot: &ResearchSnapshot, format: RenderFormat) -> Result<String> {
    match format {
        RenderFormat::Mermaid => Ok(PathRenderer::new(&snapshot.path).to_mermaid()),
        RenderFormat::Json => snapshot.to_json().context("Failed to serialize snapshot"),
    }
}

pub fn execute(file: &Path, format: RenderFormat) -> Result<()> {
    let contents = fs::read_to_string(file)
        .with_context(|| format!("Failed to read snapshot {}", file.display()))?;
    let snapshot = ResearchSnapshot::from_json(&contents)
        .with_context(|| format!("{} is not a research snapshot", file.display()))?;
    println!("{}", render_snapshot(&snapshot, format)?);
    Ok(())
}
