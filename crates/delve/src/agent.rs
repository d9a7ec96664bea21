use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::directive::DirectiveExtractor;
use crate::errors::{AgentError, AgentResult};
use crate::models::directive::{Directive, DirectiveKind};
use crate::models::message::{Message, Transcript};
use crate::models::step::{ResearchPath, ResearchStep, StepOutcome};
use crate::prompt_template::{steering_prompt, system_prompt};
use crate::providers::base::{CompletionRequest, Provider};
use crate::scanner::{ScannerOptions, TagScanner};
use crate::tools::{is_failure, ToolAdapter};
use crate::turn::{drain_turn, NullObserver, Turn, TurnObserver};

pub const NO_REPORT_SENTINEL: &str = "No final report received.";

/// How a research session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchOutcome {
    /// The model produced its final report
    Report(String),
    /// A turn carried neither a report nor a directive for the tool
    NoReport,
    /// The step ceiling was reached first
    Exhausted { steps: usize },
}

impl ResearchOutcome {
    /// The report text, or a sentence explaining why there is none
    pub fn text(&self) -> String {
        match self {
            ResearchOutcome::Report(report) => report.clone(),
            ResearchOutcome::NoReport => NO_REPORT_SENTINEL.to_string(),
            ResearchOutcome::Exhausted { steps } => format!(
                "{} Research stopped after {} steps.",
                NO_REPORT_SENTINEL, steps
            ),
        }
    }

    pub fn is_report(&self) -> bool {
        matches!(self, ResearchOutcome::Report(_))
    }
}

enum LoopState {
    Started,
    AwaitingTurn,
    DispatchingTool { turn: Turn, directive: String },
    TerminatedByReport(String),
    TerminatedNoDirective,
    Exhausted,
}

/// Drives a research dialogue between one model and one tool
pub struct ResearchAgent {
    provider: Arc<dyn Provider>,
    tool: Box<dyn ToolAdapter>,
    config: SessionConfig,
    extractor: DirectiveExtractor,
    scanner: TagScanner,
    observer: Box<dyn TurnObserver>,
    system_prompt: String,
    transcript: Transcript,
    path: ResearchPath,
    started: bool,
}

impl ResearchAgent {
    /// Create a session; the system prompt is chosen from the tool's directive kind
    pub fn new(
        provider: Arc<dyn Provider>,
        tool: Box<dyn ToolAdapter>,
        config: SessionConfig,
    ) -> AgentResult<Self> {
        config.validate()?;
        let extractor = DirectiveExtractor::new(&config.tags)?;
        let scanner = TagScanner::new(
            config.tags.annotation(),
            ScannerOptions {
                retain_annotated: config.retain_reasoning,
                echo: config.echo,
            },
        );
        let system_prompt = system_prompt(tool.directive(), &config.tags)?;

        Ok(Self {
            provider,
            tool,
            config,
            extractor,
            scanner,
            observer: Box::new(NullObserver),
            system_prompt,
            transcript: Transcript::new(),
            path: ResearchPath::new(),
            started: false,
        })
    }

    /// Receive display text while turns stream
    pub fn with_observer(mut self, observer: Box<dyn TurnObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn research_path(&self) -> &ResearchPath {
        &self.path
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run the session to completion.
    ///
    /// A session runs once. `Err` means the inference transport failed; every
    /// other ending is a [`ResearchOutcome`].
    pub async fn run(&mut self, initial_prompt: &str) -> AgentResult<ResearchOutcome> {
        if self.started {
            return Err(AgentError::Internal(
                "research session has already run".to_string(),
            ));
        }
        self.started = true;

        let expected = self.tool.directive();
        let stops = self.config.stop_sequences_for(expected);
        let mut prompt = initial_prompt.to_string();
        let mut state = LoopState::Started;

        loop {
            state = match state {
                LoopState::Started => {
                    self.transcript
                        .push(Message::system(self.system_prompt.clone()));
                    self.transcript
                        .push(Message::user(steering_prompt(initial_prompt)?));
                    LoopState::AwaitingTurn
                }
                LoopState::AwaitingTurn => {
                    if self.is_exhausted() {
                        LoopState::Exhausted
                    } else {
                        let turn = self.next_turn(&stops).await?;
                        self.classify(&prompt, turn, expected)
                    }
                }
                LoopState::DispatchingTool { turn, directive } => {
                    info!(tool = self.tool.name(), directive = %directive, "dispatching directive");
                    let result = self.tool.execute(&directive).await;
                    if is_failure(&result) {
                        warn!(tool = self.tool.name(), "tool could not service directive");
                    }

                    let step = ResearchStep::tool_call(&prompt, &turn.retained, &result)
                        .with_reasoning(turn.reasoning().map(String::from));
                    self.path.record(step);
                    self.transcript.push(Message::user(result));
                    prompt = directive;
                    LoopState::AwaitingTurn
                }
                LoopState::TerminatedByReport(report) => {
                    info!(steps = self.path.len(), "research finished with a report");
                    return Ok(ResearchOutcome::Report(report));
                }
                LoopState::TerminatedNoDirective => {
                    info!(steps = self.path.len(), "research stopped without a directive");
                    return Ok(ResearchOutcome::NoReport);
                }
                LoopState::Exhausted => {
                    warn!(steps = self.path.len(), "research hit its step ceiling");
                    return Ok(ResearchOutcome::Exhausted {
                        steps: self.path.len(),
                    });
                }
            };
        }
    }

    fn is_exhausted(&self) -> bool {
        self.config
            .max_steps
            .is_some_and(|max| self.path.len() >= max)
    }

    /// Decide what a finished turn asks for, recording terminal steps.
    ///
    /// A directive with an empty payload counts as no directive at all.
    fn classify(&mut self, prompt: &str, turn: Turn, expected: DirectiveKind) -> LoopState {
        self.transcript.push(Message::assistant(turn.retained.clone()));
        let reasoning = turn.reasoning().map(String::from);

        // a report ends the session whatever else the turn carries
        if let Directive::Report(report) = self.extractor.extract(DirectiveKind::Report, &turn.retained) {
            debug!("turn carried a report");
            let step = ResearchStep::terminal(prompt, turn.retained, StepOutcome::Report)
                .with_reasoning(reasoning);
            self.path.record(step);
            return LoopState::TerminatedByReport(report);
        }

        let directive = self.extractor.extract(expected, &turn.retained);
        match directive.text().filter(|text| !text.is_empty()) {
            None => {
                debug!(expected = %expected, "turn carried no directive");
                let step = ResearchStep::terminal(prompt, turn.retained, StepOutcome::NoDirective)
                    .with_reasoning(reasoning);
                self.path.record(step);
                LoopState::TerminatedNoDirective
            }
            Some(text) => {
                debug!(expected = %expected, "turn carried a directive");
                LoopState::DispatchingTool {
                    directive: text.to_string(),
                    turn,
                }
            }
        }
    }

    async fn next_turn(&mut self, stops: &[String]) -> AgentResult<Turn> {
        debug!(messages = self.transcript.len(), "requesting turn");
        let request = CompletionRequest {
            model: &self.config.model,
            messages: self.transcript.messages(),
            temperature: self.config.temperature,
            stop: stops,
        };
        let stream = self
            .provider
            .stream(&request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let mut turn = drain_turn(stream, &mut self.scanner, self.observer.as_ref())
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;
        if let Some(restored) = turn.restore_stop_sequence(stops) {
            debug!(stop = %restored, "restored stop sequence");
        }
        Ok(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;
    use crate::providers::base::{Chunk, ChunkStream, FinishReason};
    use crate::providers::mock::MockProvider;
    use crate::tools::search::MockSearchTool;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        async fn stream(&self, _request: &CompletionRequest<'_>) -> anyhow::Result<ChunkStream> {
            Err(anyhow!("503 Service Unavailable"))
        }
    }

    fn agent(provider: MockProvider) -> ResearchAgent {
        ResearchAgent::new(
            Arc::new(provider),
            Box::new(MockSearchTool::new()),
            SessionConfig::default().with_echo(false),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_transcript_layout() {
        let provider = MockProvider::with_texts(&[
            "<think>start broad</think><query>solana fees</query>",
            "<report>Fees are low.</report>",
        ]);
        let mut agent = agent(provider.clone());
        let outcome = agent.run("Is Solana cheap?").await.unwrap();
        assert_eq!(outcome, ResearchOutcome::Report("Fees are low.".to_string()));

        let roles: Vec<Role> = agent.transcript().messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        let messages = agent.transcript().messages();
        assert!(messages[1].content.starts_with("Is Solana cheap?"));
        // reasoning never reaches the transcript
        assert_eq!(messages[2].content, "<query>solana fees</query>");
        assert!(messages[3].content.contains("```search 1"));

        // the second request saw the tool result
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 4);

        let first = agent.research_path().get(0).unwrap();
        assert_eq!(first.prompt, "Is Solana cheap?");
        assert_eq!(first.reasoning.as_deref(), Some("start broad"));
        let second = agent.research_path().get(1).unwrap();
        assert_eq!(second.prompt, "solana fees");
        assert!(second.is_report());
    }

    #[tokio::test]
    async fn test_stripped_stop_sequence_still_dispatches() {
        // the transport swallowed `</query>`
        let provider = MockProvider::new(vec![
            vec![
                Chunk::text("<query>solana "),
                Chunk::text("validators").with_finish_reason(FinishReason::Stop),
            ],
            vec![Chunk::text("<report>done").with_finish_reason(FinishReason::Stop)],
        ]);
        let mut agent = agent(provider);
        let outcome = agent.run("q").await.unwrap();

        assert_eq!(outcome.text(), "done");
        let first = agent.research_path().get(0).unwrap();
        assert_eq!(first.turn, "<query>solana validators</query>");
        assert_eq!(first.outcome, StepOutcome::ToolCall);
    }

    #[tokio::test]
    async fn test_truncated_turn_is_not_a_directive() {
        let provider = MockProvider::new(vec![vec![
            Chunk::text("<query>solana").with_finish_reason(FinishReason::Length),
        ]]);
        let mut agent = agent(provider);
        let outcome = agent.run("q").await.unwrap();
        assert_eq!(outcome, ResearchOutcome::NoReport);
        assert_eq!(outcome.text(), NO_REPORT_SENTINEL);
        assert_eq!(agent.research_path().len(), 1);
    }

    #[tokio::test]
    async fn test_report_wins_over_directive_in_same_turn() {
        let provider =
            MockProvider::with_texts(&["<query>more</query><report>enough</report>"]);
        let mut agent = agent(provider);
        let outcome = agent.run("q").await.unwrap();
        assert_eq!(outcome, ResearchOutcome::Report("enough".to_string()));
        assert_eq!(agent.research_path().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_directive_ends_the_session() {
        let provider = MockProvider::with_texts(&["<query>   </query>", "<report>unused</report>"]);
        let mut agent = agent(provider.clone());
        let outcome = agent.run("q").await.unwrap();

        assert_eq!(outcome, ResearchOutcome::NoReport);
        let step = agent.research_path().get(0).unwrap();
        assert_eq!(step.outcome, StepOutcome::NoDirective);
        assert_eq!(step.tool_result, None);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_other_directive_kinds_are_ignored() {
        let provider = MockProvider::with_texts(&["<cypher>MATCH (n) RETURN n</cypher>"]);
        let mut agent = agent(provider);
        let outcome = agent.run("q").await.unwrap();
        assert_eq!(outcome, ResearchOutcome::NoReport);
    }

    #[tokio::test]
    async fn test_step_ceiling() {
        let provider = MockProvider::with_texts(&[
            "<query>a</query>",
            "<query>b</query>",
            "<query>c</query>",
        ]);
        let mut agent = ResearchAgent::new(
            Arc::new(provider.clone()),
            Box::new(MockSearchTool::new()),
            SessionConfig::default().with_echo(false).with_max_steps(Some(2)),
        )
        .unwrap();

        let outcome = agent.run("q").await.unwrap();
        assert_eq!(outcome, ResearchOutcome::Exhausted { steps: 2 });
        assert!(outcome.text().starts_with(NO_REPORT_SENTINEL));
        assert_eq!(agent.research_path().len(), 2);
        // no turn is requested once the ceiling is reached
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        let mut agent = ResearchAgent::new(
            Arc::new(FailingProvider),
            Box::new(MockSearchTool::new()),
            SessionConfig::default(),
        )
        .unwrap();
        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(ref msg) if msg.contains("503")));
        assert!(agent.research_path().is_empty());
    }

    #[tokio::test]
    async fn test_session_runs_once() {
        let mut agent = agent(MockProvider::with_texts(&["<report>x</report>"]));
        agent.run("q").await.unwrap();
        assert!(matches!(
            agent.run("q").await,
            Err(AgentError::Internal(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = ResearchAgent::new(
            Arc::new(MockProvider::default()),
            Box::new(MockSearchTool::new()),
            SessionConfig::new(" "),
        );
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
    }
}
