//! CLI command definitions for ideaforge.
//!
//! Projects live in a local SQLite file. Identity is simulated: every
//! command acts on behalf of `--owner`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::{render_transcript, ChatAssistant, ChatMessage};
use crate::config::AppConfig;
use crate::crew::{
    CrewConfig, CrewError, CrewEvent, Domain, DomainRegistry, PipelineSpec, Report, ReviewOptions,
    ReviewService, Tier,
};
use crate::llm::{LiteLlmClient, LlmProvider};
use crate::store::{FieldUpdate, NewProject, Project, ProjectStore, SqliteStore};

/// Idea incubator with multi-critic reviews.
#[derive(Parser)]
#[command(name = "ideaforge")]
#[command(about = "Draft ideas with an assistant and put them in front of a panel of critics")]
#[command(version)]
#[command(
    long_about = "ideaforge keeps stories, digital products and physical ventures as two-tier projects \
(macro: world or strategy, micro: scene or execution) and reviews each tier with a fixed crew of critic personas.\n\n\
Example usage:\n  ideaforge new --domain history --title \"Dune Clone\"\n  ideaforge draft <ID> --tier macro --file world.md\n  ideaforge review <ID> --tier macro"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// SQLite database path (overrides IDEAFORGE_DB).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Acting user (overrides IDEAFORGE_OWNER).
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Model identifier (overrides IDEAFORGE_MODEL).
    #[arg(short = 'm', long, global = true)]
    pub model: Option<String>,

    /// Model API key.
    #[arg(long, env = "IDEAFORGE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a project.
    New(NewArgs),

    /// List your projects in one domain.
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a project.
    Show(ShowArgs),

    /// Delete a project.
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Replace the macro or micro draft.
    Draft(DraftArgs),

    /// Talk to the drafting assistant of one tier.
    Chat(ChatArgs),

    /// Run the critic crew over one tier and store the report.
    ///
    /// Press Ctrl-C to cancel; a cancelled run stores nothing.
    Review(ReviewArgs),

    /// Show stored reports, newest first.
    Reports(ReportsArgs),

    /// List the critic crews.
    Crews(CrewsArgs),
}

#[derive(Parser, Debug)]
pub struct NewArgs {
    /// history, digital-product or physical-venture.
    #[arg(short = 'd', long)]
    pub domain: Domain,

    #[arg(short = 't', long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[arg(short = 'd', long)]
    pub domain: Domain,

    /// Output as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    pub id: Uuid,

    /// Include both chat transcripts.
    #[arg(long)]
    pub chat: bool,

    /// Output as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    pub id: Uuid,
}

#[derive(Parser, Debug)]
pub struct DraftArgs {
    pub id: Uuid,

    #[arg(long)]
    pub tier: Tier,

    /// New draft text.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// Read the new draft from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ChatArgs {
    pub id: Uuid,

    #[arg(long)]
    pub tier: Tier,

    pub message: String,
}

#[derive(Parser, Debug)]
pub struct ReviewArgs {
    pub id: Uuid,

    #[arg(long)]
    pub tier: Tier,

    /// Include the consolidation step.
    #[arg(long, conflicts_with = "no_consolidate")]
    pub consolidate: bool,

    /// Skip the consolidation step.
    #[arg(long)]
    pub no_consolidate: bool,

    /// Output as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

impl ReviewArgs {
    fn consolidate_override(&self) -> Option<bool> {
        match (self.consolidate, self.no_consolidate) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ReportsArgs {
    pub id: Uuid,

    #[arg(long)]
    pub tier: Tier,

    /// Only the most recent report.
    #[arg(long)]
    pub latest: bool,

    /// Output as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct CrewsArgs {
    /// Output as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parse CLI args and run the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;

    if let Commands::Crews(args) = &cli.command {
        return run_crews_command(args);
    }

    let store: Arc<dyn ProjectStore> = Arc::new(
        SqliteStore::open(&config.database_path)
            .await
            .with_context(|| format!("opening {}", config.database_path.display()))?,
    );

    match cli.command {
        Commands::New(args) => run_new_command(&config, store, args).await,
        Commands::List(args) => run_list_command(&config, store, args).await,
        Commands::Show(args) => run_show_command(store, args).await,
        Commands::Delete(args) => run_delete_command(store, args).await,
        Commands::Draft(args) => run_draft_command(store, args).await,
        Commands::Chat(args) => run_chat_command(&config, store, args).await,
        Commands::Review(args) => run_review_command(&config, store, args).await,
        Commands::Reports(args) => run_reports_command(store, args).await,
        Commands::Crews(_) => Ok(()),
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::from_env()?;
    if let Some(db) = &cli.db {
        config = config.with_database_path(db);
    }
    if let Some(owner) = &cli.owner {
        config = config.with_owner(owner);
    }
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if let Some(key) = cli.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        config = config.with_api_key(key);
    }
    config.validate()?;
    Ok(config)
}

fn llm_from_config(config: &AppConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let client = LiteLlmClient::from_config(config).context("creating model client")?;
    Ok(Arc::new(client))
}

async fn load_project(store: &Arc<dyn ProjectStore>, id: Uuid) -> anyhow::Result<Project> {
    store
        .get_project(id)
        .await?
        .with_context(|| format!("project {} not found", id))
}

// ============================================================================
// Project Commands
// ============================================================================

async fn run_new_command(
    config: &AppConfig,
    store: Arc<dyn ProjectStore>,
    args: NewArgs,
) -> anyhow::Result<()> {
    let project = store
        .create_project(
            NewProject::new(config.owner.as_str(), args.title, args.domain)
                .with_description(args.description),
        )
        .await?;

    println!("✓ Created project {}", project.id);
    println!("  Title:  {}", project.title);
    println!("  Domain: {}", project.domain.display_name());
    Ok(())
}

async fn run_list_command(
    config: &AppConfig,
    store: Arc<dyn ProjectStore>,
    args: ListArgs,
) -> anyhow::Result<()> {
    let projects = store.list_projects(&config.owner, args.domain).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No {} projects for {}.", args.domain.display_name(), config.owner);
        return Ok(());
    }

    for project in &projects {
        println!(
            "{}  {:<10} {}  ({} macro / {} micro reports)",
            project.id,
            project.status,
            project.title,
            project.reports_macro.len(),
            project.reports_micro.len()
        );
    }
    Ok(())
}

async fn run_show_command(store: Arc<dyn ProjectStore>, args: ShowArgs) -> anyhow::Result<()> {
    let project = load_project(&store, args.id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&project)?);
        return Ok(());
    }

    println!("=== {} ===", project.title);
    println!("Id:       {}", project.id);
    println!("Domain:   {}", project.domain.display_name());
    println!("Status:   {}", project.status);
    println!("Owner:    {}", project.owner_email);
    println!("Created:  {}", project.created_at.format("%d/%m/%Y %H:%M"));
    if !project.description.is_empty() {
        println!("About:    {}", project.description);
    }
    for tier in [Tier::Macro, Tier::Micro] {
        println!();
        println!(
            "--- {} ({} chat messages, {} reports) ---",
            tier,
            project.chat(tier).len(),
            project.reports(tier).len()
        );
        let text = project.text(tier);
        if text.trim().is_empty() {
            println!("(empty)");
        } else {
            println!("{}", text);
        }
        if args.chat {
            if let Some(transcript) = transcript_section(&project, tier) {
                println!("\n{}", transcript);
            }
        }
    }
    Ok(())
}

fn transcript_section(project: &Project, tier: Tier) -> Option<String> {
    let messages = project.chat(tier);
    if messages.is_empty() {
        return None;
    }
    Some(format!("[{} chat]\n{}", tier, render_transcript(messages)))
}

async fn run_delete_command(store: Arc<dyn ProjectStore>, args: DeleteArgs) -> anyhow::Result<()> {
    if store.delete_project(args.id).await? {
        println!("✓ Deleted project {}", args.id);
    } else {
        warn!(id = %args.id, "No project to delete");
        println!("No project {}", args.id);
    }
    Ok(())
}

async fn run_draft_command(store: Arc<dyn ProjectStore>, args: DraftArgs) -> anyhow::Result<()> {
    let text = match (args.text, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => anyhow::bail!("either --text or --file is required"),
    };

    let chars = text.chars().count();
    store
        .update_field(args.id, FieldUpdate::Text { tier: args.tier, text })
        .await?;

    println!("✓ Saved {} draft ({} characters)", args.tier, chars);
    Ok(())
}

async fn run_chat_command(
    config: &AppConfig,
    store: Arc<dyn ProjectStore>,
    args: ChatArgs,
) -> anyhow::Result<()> {
    let project = load_project(&store, args.id).await?;
    let assistant = ChatAssistant::new(llm_from_config(config)?);

    let reply = assistant
        .reply(
            project.domain,
            args.tier,
            &project.macro_text,
            project.chat(args.tier),
            &args.message,
        )
        .await?;

    println!("{}", reply.text);

    store
        .append_chat(
            args.id,
            args.tier,
            vec![ChatMessage::user(args.message), reply],
        )
        .await?;
    Ok(())
}

// ============================================================================
// Review Commands
// ============================================================================

async fn run_review_command(
    config: &AppConfig,
    store: Arc<dyn ProjectStore>,
    args: ReviewArgs,
) -> anyhow::Result<()> {
    let service = ReviewService::new(
        llm_from_config(config)?,
        store,
        CrewConfig::from_app_config(config),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling review...");
            trigger.cancel();
        }
    });

    let (event_tx, event_rx) = mpsc::channel(32);
    let printer = tokio::spawn(print_events(event_rx, args.json));

    let mut options = ReviewOptions::new()
        .with_cancel(cancel)
        .with_events(event_tx);
    options.consolidate = args.consolidate_override();

    info!(id = %args.id, tier = %args.tier, "Review requested");
    let result = service.review_project(args.id, args.tier, &options).await;

    drop(options);
    let _ = printer.await;
    interrupt.abort();

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            if let Some(hint) = failure_hint(&err) {
                eprintln!("{}", hint);
            }
            return Err(err.into());
        }
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn failure_hint(err: &CrewError) -> Option<&'static str> {
    if err.is_step_failure() {
        Some("Nothing was stored. Run the review again to retry the whole crew.")
    } else {
        None
    }
}

async fn print_events(mut rx: mpsc::Receiver<CrewEvent>, quiet: bool) {
    while let Some(event) = rx.recv().await {
        if quiet {
            continue;
        }
        match event {
            CrewEvent::RunStarted {
                pipeline,
                total_steps,
                consolidated,
                ..
            } => {
                let suffix = if consolidated { ", consolidated" } else { "" };
                eprintln!("Analysing with {} ({} steps{})...", pipeline, total_steps, suffix);
            }
            CrewEvent::StepStarted {
                index,
                total_steps,
                role,
                ..
            } => eprintln!("  [{}/{}] {}", index + 1, total_steps, role),
            CrewEvent::StepCompleted { latency_ms, .. } => {
                eprintln!("        done in {:.1}s", latency_ms as f64 / 1000.0)
            }
            CrewEvent::RunCompleted { duration_ms, .. } => {
                eprintln!("✓ Review finished in {:.1}s", duration_ms as f64 / 1000.0)
            }
            CrewEvent::RunFailed { error, .. } => eprintln!("✗ {}", error),
        }
    }
}

fn print_report(report: &Report) {
    println!("\n=== Report {} ===\n", report.date);
    println!("{}", report.content);
}

async fn run_reports_command(store: Arc<dyn ProjectStore>, args: ReportsArgs) -> anyhow::Result<()> {
    let project = load_project(&store, args.id).await?;
    let reports = reports_to_show(&project, args.tier, args.latest);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No {} reports yet.", args.tier);
        return Ok(());
    }
    for report in reports {
        print_report(report);
    }
    Ok(())
}

fn reports_to_show(project: &Project, tier: Tier, latest: bool) -> Vec<&Report> {
    if latest {
        project.latest_report(tier).into_iter().collect()
    } else {
        project.reports_newest_first(tier)
    }
}

#[derive(Serialize)]
struct CrewSummary<'a> {
    domain: Domain,
    tier: Tier,
    name: &'a str,
    critics: Vec<&'a str>,
    consolidator: &'a str,
    consolidate_by_default: bool,
}

impl<'a> From<&'a PipelineSpec> for CrewSummary<'a> {
    fn from(spec: &'a PipelineSpec) -> Self {
        Self {
            domain: spec.domain,
            tier: spec.tier,
            name: spec.name,
            critics: spec.critics.iter().map(|s| s.persona.role).collect(),
            consolidator: spec.consolidator.persona.role,
            consolidate_by_default: spec.consolidate_by_default,
        }
    }
}

fn run_crews_command(args: &CrewsArgs) -> anyhow::Result<()> {
    let registry = DomainRegistry::with_catalog();
    let mut summaries = Vec::with_capacity(registry.len());
    for (domain, tier) in registry.pairs() {
        summaries.push(CrewSummary::from(registry.get(domain, tier)?));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for crew in &summaries {
        let consolidation = if crew.consolidate_by_default {
            "on by default"
        } else {
            "optional"
        };
        println!("{} / {}: {}", crew.domain, crew.tier, crew.name);
        println!("  Critics:      {}", crew.critics.join(" → "));
        println!("  Consolidator: {} ({})", crew.consolidator, consolidation);
    }
    Ok(())
}
