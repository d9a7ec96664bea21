use anyhow::{Context, Result};
use bat::WrappingMode;
use chrono::Utc;
use console::style;
use std::path::PathBuf;

use delve::agent::ResearchAgent;
use delve::prompt_template::system_prompt_from_file;
use delve::providers::factory::get_provider;
use delve::tools::factory::{get_tool, ToolType};

use crate::artifacts::write_artifacts;
use crate::configuration::{Settings, ToolSettings};
use crate::observer::ConsoleObserver;

#[derive(Debug, Clone)]
pub struct ResearchArgs {
    pub question: String,
    pub tool: Option<ToolType>,
    pub mock_tools: bool,
    pub max_steps: Option<usize>,
    pub system_prompt: Option<PathBuf>,
    pub output: PathBuf,
    pub quiet: bool,
}

pub async fn execute(settings: Settings, args: ResearchArgs) -> Result<()> {
    let Settings {
        provider,
        tool,
        mut session,
    } = settings;

    if let Some(max_steps) = args.max_steps {
        session.max_steps = max_steps;
    }
    let tool = match args.tool {
        Some(tool_type) if tool_type != tool.tool_type() => ToolSettings::for_type(tool_type),
        _ => tool,
    };

    let provider_type = provider.provider_type();
    let provider = get_provider(provider.into_config())?;
    let tool_config = tool.into_config(&session, args.mock_tools)?;
    let config = session.into_config().with_echo(!args.quiet);
    tracing::debug!(tool = %tool_config.tool_type(), "building tool");
    let tool = get_tool(tool_config, provider.clone(), &config.tags)?;

    let system_prompt = match &args.system_prompt {
        Some(path) => Some(
            system_prompt_from_file(path, &config.tags)
                .with_context(|| format!("Failed to load system prompt {}", path.display()))?,
        ),
        None => None,
    };
    cliclack::log::info(format!(
        "Researching with {} via {} ({} tool, at most {} steps)",
        style(&config.model).cyan(),
        provider_type,
        tool.name(),
        config.max_steps.unwrap_or_default()
    ))?;

    let mut agent = ResearchAgent::new(provider, tool, config)?;
    if let Some(system_prompt) = system_prompt {
        agent = agent.with_system_prompt(system_prompt);
    }
    if !args.quiet {
        agent = agent.with_observer(Box::new(ConsoleObserver));
    }

    let outcome = agent
        .run(&args.question)
        .await
        .context("Research session failed")?;

    let steps = agent.research_path().len();
    if outcome.is_report() {
        cliclack::log::success(format!("Report received after {} steps", steps))?;
    } else {
        cliclack::log::warning(outcome.text())?;
    }

    let paths = write_artifacts(&args.output, &outcome, agent.research_path(), Utc::now())?;
    cliclack::log::step(format!(
        "Saved {}, {} and {}",
        paths.report.display(),
        paths.diagram.display(),
        paths.snapshot.display()
    ))?;

    if outcome.is_report() {
        print_markdown(&outcome.text())?;
    }
    Ok(())
}

fn print_markdown(content: &str) -> Result<()> {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print()
        .context("Failed to render report")?;
    Ok(())
}
