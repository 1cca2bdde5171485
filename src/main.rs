//! weekly-report - multi-agent weekly report generator.
//!
//! Turns meeting notes into a drafted, reviewed and signed-off weekly
//! status report.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weekly_report::ai::provider_from_config;
use weekly_report::core::{Config, RunMode};
use weekly_report::integrations::NotionClient;
use weekly_report::notes::{load_meeting_notes, resolve_notes, NoteExtractor, NoteSummary};
use weekly_report::pipeline::{
    format_report, save_report, PipelineOrchestrator, PipelineResult, PipelineStage,
};

/// Multi-agent weekly report generator
#[derive(Parser)]
#[command(name = "weekly-report")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the discovered one
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Execution mode
    #[arg(long, value_enum, global = true)]
    mode: Option<RunMode>,

    /// Meeting note files (the built-in sample is used when omitted)
    #[arg(long, num_args = 1.., value_name = "PATH", global = true)]
    notes: Vec<PathBuf>,

    /// Do not pull updates from Notion
    #[arg(long, global = true)]
    no_notion: bool,

    /// Output directory for the report
    #[arg(short, long, value_name = "DIR", global = true)]
    output: Option<PathBuf>,

    /// Print the run result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Publish the finished report to Notion as a new page
    #[arg(long, global = true)]
    publish: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a weekly report (default)
    Run,

    /// Extract achievements, tasks and issues from notes without calling a model
    Extract {
        /// Meeting note files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let mode = cli.mode.unwrap_or(config.general.mode);

    // Setup logging; RUST_LOG wins over the mode default
    let default_filter = if cli.verbose { "debug" } else { mode.default_log_filter() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        None | Some(Commands::Run) => cmd_generate(&cli, config),
        Some(Commands::Extract { ref paths, ref format }) => cmd_extract(paths, format),
        Some(Commands::Config { path }) => cmd_config(&config, path),
        Some(Commands::Completions { shell }) => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Run the full pipeline and save the report.
fn cmd_generate(cli: &Cli, config: Config) -> Result<()> {
    let output_dir = cli.output.clone().unwrap_or_else(|| config.general.output_dir.clone());

    let notes = resolve_notes(&cli.notes);

    let provider = provider_from_config(&config.ai)?;
    let mut pipeline = PipelineOrchestrator::new(provider, &config.agents);

    let notion = NotionClient::from_env(&config.notion);
    match notion {
        Some(ref client) => {
            pipeline = pipeline.with_workspace(Arc::new(client.clone()), config.notion.lookback_days);
            tracing::info!("Notion integration enabled");
        }
        None => {
            tracing::warn!("Notion integration disabled (missing API key or database ID)");
        }
    }
    let use_workspace = config.notion.enabled && !cli.no_notion;

    // Create tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;

    let quiet = cli.json;
    let outcome = rt.block_on(pipeline.run_with_progress(notes, use_workspace, |stage| {
        if !quiet {
            print_progress(stage);
        }
    }));

    let result = match outcome {
        Ok(result) => result,
        Err(failure) => {
            if cli.json {
                let body = serde_json::json!({
                    "error": failure.error,
                    "stage": failure.stage,
                    "details": failure.details.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            eprintln!("\n✗ {}", failure);
            std::process::exit(1);
        }
    };

    let path = save_report(&result, &output_dir)?;

    let page_id = if cli.publish {
        let client = notion.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "Notion integration not configured.\n\n\
                 To publish, set NOTION_API_KEY and NOTION_DATABASE_ID."
            )
        })?;
        Some(rt.block_on(publish(client, &result))?)
    } else {
        None
    };

    if cli.json {
        let body = serde_json::json!({
            "report_path": path,
            "notion_page_id": page_id,
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("\n✓ Report saved: {}", path.display());
        if let Some(id) = page_id {
            println!("✓ Published to Notion: {}", id);
        }
    }

    Ok(())
}

fn print_progress(stage: PipelineStage) {
    let message = match stage {
        PipelineStage::Drafting => "Writing draft...",
        PipelineStage::Reviewing => "Reviewing draft...",
        PipelineStage::Revising => "Applying review suggestions...",
        PipelineStage::Commenting => "Getting manager comment...",
        PipelineStage::Done => {
            eprintln!("✓ All stages complete");
            return;
        }
        PipelineStage::Failed => return,
    };

    if let Some((step, total)) = stage.step() {
        eprintln!("[{}/{}] {}", step, total, message);
    }
}

/// Publish a finished report as a Notion page.
async fn publish(client: &NotionClient, result: &PipelineResult) -> Result<String> {
    let title = format!("週報 - {}", result.completed_at.format("%Y年%m月%d日"));
    client
        .create_page(&title, &format_report(result))
        .await
        .context("Failed to publish report to Notion")
}

/// Run the note extractor only.
fn cmd_extract(paths: &[PathBuf], format: &str) -> Result<()> {
    let notes = load_meeting_notes(paths);
    if notes.is_empty() {
        anyhow::bail!("No readable note files");
    }

    let summary = NoteExtractor::new().parse_all(notes.as_slice());

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        "text" => print_summary(&summary),
        other => anyhow::bail!("Unsupported format: {other}. Supported: text, json"),
    }

    Ok(())
}

fn print_summary(summary: &NoteSummary) {
    let sections = [
        ("Achievements", &summary.achievements),
        ("Tasks", &summary.tasks),
        ("Issues", &summary.issues),
    ];

    for (title, items) in sections {
        println!("{} ({}):", title, items.len());
        if items.is_empty() {
            println!("  - none");
        }
        for item in items {
            println!("  - {}", item);
        }
        println!();
    }
}

/// Show configuration.
fn cmd_config(config: &Config, show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::global_config_path() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let toml = toml::to_string_pretty(config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "weekly-report", &mut io::stdout());
}
