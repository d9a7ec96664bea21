//! Renders a finished research path as a Mermaid flowchart or a JSON snapshot
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::step::{ResearchPath, ResearchStep};

const LABEL_LIMIT: usize = 50;

const CLASS_DEFS: [&str; 5] = [
    "classDef prompt fill:#e1f5fe,stroke:#0288d1,color:#01579b",
    "classDef turn fill:#f3e5f5,stroke:#7b1fa2,color:#4a148c",
    "classDef thinking fill:#fff8e1,stroke:#ffa000,color:#ff6f00,stroke-dasharray:4 2",
    "classDef result fill:#e8f5e9,stroke:#388e3c,color:#1b5e20",
    "classDef report fill:#fce4ec,stroke:#c2185b,color:#880e4f,stroke-width:3px",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub timestamp: DateTime<Utc>,
    pub total_steps: usize,
}

/// Archival form of a research path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSnapshot {
    pub metadata: SnapshotMetadata,
    pub path: ResearchPath,
}

impl ResearchSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

pub struct PathRenderer<'a> {
    path: &'a ResearchPath,
}

impl<'a> PathRenderer<'a> {
    pub fn new(path: &'a ResearchPath) -> Self {
        Self { path }
    }

    /// A top-down flowchart chaining prompt, turn and tool result of every step
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["flowchart TD".to_string()];
        lines.extend(CLASS_DEFS.iter().map(|def| format!("    {}", def)));

        let mut previous: Option<String> = None;
        for (i, step) in self.path.iter().enumerate() {
            let prompt = format!("prompt_{}", i);
            let turn = format!("turn_{}", i);

            lines.push(format!(
                "    {}[\"{}\"]:::prompt",
                prompt,
                label(&step.prompt)
            ));
            lines.push(format!(
                "    {}[\"{}\"]:::{}",
                turn,
                turn_label(step),
                turn_class(step)
            ));
            if let Some(from) = previous.take() {
                lines.push(format!("    {} --> {}", from, prompt));
            }
            lines.push(format!("    {} --> {}", prompt, turn));

            match &step.tool_result {
                Some(result) => {
                    let node = format!("result_{}", i);
                    lines.push(format!("    {}[\"{}\"]:::result", node, result_label(result)));
                    lines.push(format!("    {} --> {}", turn, node));
                    previous = Some(node);
                }
                None => previous = Some(turn),
            }
        }
        lines.join("\n")
    }

    /// The flowchart fenced for embedding in markdown
    pub fn to_markdown(&self) -> String {
        format!("```mermaid\n{}\n```", self.to_mermaid())
    }

    pub fn to_snapshot(&self, generated_at: DateTime<Utc>) -> ResearchSnapshot {
        ResearchSnapshot {
            metadata: SnapshotMetadata {
                timestamp: generated_at,
                total_steps: self.path.len(),
            },
            path: self.path.clone(),
        }
    }

    pub fn snapshot_now(&self) -> ResearchSnapshot {
        self.to_snapshot(Utc::now())
    }
}

fn turn_class(step: &ResearchStep) -> &'static str {
    if step.is_report() {
        "report"
    } else if step.reasoned {
        "thinking"
    } else {
        "turn"
    }
}

fn turn_label(step: &ResearchStep) -> String {
    let text = label(&step.turn);
    if step.reasoned {
        format!("🤔 {}", text)
    } else {
        text
    }
}

fn result_label(result: &str) -> String {
    let found = result
        .lines()
        .filter(|line| line.starts_with("```search"))
        .count();
    if found > 0 {
        format!("{} results found", found)
    } else {
        label(result)
    }
}

/// Single-line, truncated text safe inside a quoted Mermaid label
fn label(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated = if flat.chars().count() > LABEL_LIMIT {
        let head: String = flat.chars().take(LABEL_LIMIT).collect();
        format!("{}...", head)
    } else {
        flat
    };
    truncated
        .replace('"', "#quot;")
        .replace('<', "#lt;")
        .replace('>', "#gt;")
}
