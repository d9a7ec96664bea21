use serde::{Deserialize, Serialize};

/// How a research step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// A directive was dispatched to the tool and its result fed back
    ToolCall,
    /// The turn carried the final report
    Report,
    /// The turn carried neither a report nor a usable directive
    NoDirective,
}

/// One prompt / model turn / tool result triple of a research session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchStep {
    pub prompt: String,
    pub turn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// The turn opened a reasoning span, possibly an empty one
    #[serde(default)]
    pub reasoned: bool,
    pub tool_result: Option<String>,
    pub outcome: StepOutcome,
}

impl ResearchStep {
    pub fn tool_call<P, T, R>(prompt: P, turn: T, tool_result: R) -> Self
    where
        P: Into<String>,
        T: Into<String>,
        R: Into<String>,
    {
        Self {
            prompt: prompt.into(),
            turn: turn.into(),
            reasoning: None,
            reasoned: false,
            tool_result: Some(tool_result.into()),
            outcome: StepOutcome::ToolCall,
        }
    }

    pub fn terminal<P, T>(prompt: P, turn: T, outcome: StepOutcome) -> Self
    where
        P: Into<String>,
        T: Into<String>,
    {
        Self {
            prompt: prompt.into(),
            turn: turn.into(),
            reasoning: None,
            reasoned: false,
            tool_result: None,
            outcome,
        }
    }

    /// Attach the reasoning span seen while the turn streamed.
    ///
    /// `Some("")` marks the step as reasoned without storing any text.
    pub fn with_reasoning(mut self, reasoning: Option<String>) -> Self {
        self.reasoned = reasoning.is_some();
        self.reasoning = reasoning.filter(|text| !text.trim().is_empty());
        self
    }

    pub fn is_report(&self) -> bool {
        self.outcome == StepOutcome::Report
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome != StepOutcome::ToolCall
    }
}

/// The append-only log of steps taken by one research session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResearchPath {
    steps: Vec<ResearchStep>,
}

impl ResearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step, returning its index in the path
    pub fn record(&mut self, step: ResearchStep) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    pub fn steps(&self) -> &[ResearchStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&ResearchStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResearchStep> {
        self.steps.iter()
    }
}

impl From<Vec<ResearchStep>> for ResearchPath {
    fn from(steps: Vec<ResearchStep>) -> Self {
        Self { steps }
    }
}

impl<'a> IntoIterator for &'a ResearchPath {
    type Item = &'a ResearchStep;
    type IntoIter = std::slice::Iter<'a, ResearchStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
