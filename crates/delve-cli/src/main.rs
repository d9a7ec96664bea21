use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use delve::tools::factory::ToolType;

mod artifacts;
mod commands;
mod configuration;
mod error;
mod observer;

use commands::render::RenderFormat;
use commands::research::ResearchArgs;
use configuration::Settings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ToolVariant {
    Search,
    Graph,
}

impl From<ToolVariant> for ToolType {
    fn from(variant: ToolVariant) -> Self {
        match variant {
            ToolVariant::Search => ToolType::Search,
            ToolVariant::Graph => ToolType::Graph,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Research a question until the model writes its final report
    Research {
        /// The question to research
        question: String,

        /// Tool the model directs its queries to (overrides DELVE_TOOL__TYPE)
        #[arg(short, long, value_enum)]
        tool: Option<ToolVariant>,

        /// Use the deterministic mock backend for the tool
        #[arg(long)]
        mock_tools: bool,

        /// Stop after this many steps without a report
        #[arg(long)]
        max_steps: Option<usize>,

        /// Tera template to use in place of the built-in system prompt
        #[arg(long, value_name = "FILE")]
        system_prompt: Option<PathBuf>,

        /// Directory for the report, diagram and snapshot
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Do not stream model turns to the console
        #[arg(short, long)]
        quiet: bool,
    },

    /// Render a saved research snapshot
    Render {
        /// Path to a research_path.json snapshot
        snapshot: PathBuf,

        #[arg(short, long, value_enum, default_value = "mermaid")]
        format: RenderFormat,
    },
}

fn init_logging() {
    // stdout carries the streamed turns and the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("delve=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Research {
            question,
            tool,
            mock_tools,
            max_steps,
            system_prompt,
            output,
            quiet,
        } => {
            let settings = Settings::new()?;
            let args = ResearchArgs {
                question,
                tool: tool.map(ToolType::from),
                mock_tools,
                max_steps,
                system_prompt,
                output,
                quiet,
            };
            commands::research::execute(settings, args).await
        }
        Command::Render { snapshot, format } => commands::render::execute(&snapshot, format),
    }
}
