use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use delve::agent::ResearchOutcome;
use delve::models::step::ResearchPath;
use delve::visualization::PathRenderer;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "final_report.md";
pub const DIAGRAM_FILE: &str = "research_path.mmd";
pub const SNAPSHOT_FILE: &str = "research_path.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub report: PathBuf,
    pub diagram: PathBuf,
    pub snapshot: PathBuf,
}

/// Write the report, the flowchart and the snapshot of a finished session
pub fn write_artifacts(
    dir: &Path,
    outcome: &ResearchOutcome,
    path: &ResearchPath,
    generated_at: DateTime<Utc>,
) -> Result<ArtifactPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let paths = ArtifactPaths {
        report: dir.join(REPORT_FILE),
        diagram: dir.join(DIAGRAM_FILE),
        snapshot: dir.join(SNAPSHOT_FILE),
    };
    let renderer = PathRenderer::new(path);

    write(&paths.report, &outcome.text())?;
    write(&paths.diagram, &renderer.to_mermaid())?;
    let snapshot = renderer
        .to_snapshot(generated_at)
        .to_json()
        .context("Failed to serialize research path")?;
    write(&paths.snapshot, &snapshot)?;

    Ok(paths)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
