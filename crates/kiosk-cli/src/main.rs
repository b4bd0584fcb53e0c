use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use kiosk_client::ReqwestFetcher;
use kiosk_core::models::{NewSource, SourceOutcome};
use kiosk_core::{
    DEFAULT_REFRESH_MINUTES, REFRESH_MINUTES_KEY, Scheduler, ScriptSandbox, SnapshotCell,
    StatusPublisher, TracingCycleReporter, UpdateCycle,
};
use kiosk_db::{Database, DatabaseConfig, SettingsRepository, SourceRepository};

type CliCycle = UpdateCycle<SourceRepository, ReqwestFetcher, ScriptSandbox>;

#[derive(Parser)]
#[command(name = "kiosk", version, about = "Scheduled feed aggregator with scripted extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the recurring update loop in the foreground
    Run {
        /// Allow source URLs on private/reserved addresses
        #[arg(long, default_value_t = false)]
        allow_private: bool,
    },

    /// Run one update cycle and print the result
    Update {
        /// Allow source URLs on private/reserved addresses
        #[arg(long, default_value_t = false)]
        allow_private: bool,

        /// Print the full snapshot as JSON instead of a summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Manage source definitions
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },

    /// Show or set the refresh interval in minutes
    Interval {
        /// New interval; omit to print the current one
        minutes: Option<f64>,
    },
}

#[derive(Subcommand)]
enum SourceCommands {
    /// Add a source
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        url: String,

        /// Path to the extraction script
        #[arg(short, long)]
        script: PathBuf,

        /// Create the source deactivated
        #[arg(long, default_value_t = false)]
        inactive: bool,
    },

    /// List all sources
    List,

    /// Show one source including its script
    Show { id: Uuid },

    /// Remove a source
    Rm { id: Uuid },

    /// Activate a source
    Enable { id: Uuid },

    /// Deactivate a source
    Disable { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kiosk=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { allow_private } => cmd_run(allow_private).await,
        Commands::Update {
            allow_private,
            json,
        } => cmd_update(allow_private, json).await,
        Commands::Source { command } => cmd_source(command).await,
        Commands::Interval { minutes } => cmd_interval(minutes).await,
    }
}

/// Open the database and bring it up to date.
async fn connect_db() -> Result<Database> {
    let db = Database::connect(&DatabaseConfig::from_env()?)
        .await
        .context("Failed to open database")?;
    db.migrate().await?;
    Ok(db)
}

fn build_cycle(db: &Database, allow_private: bool) -> Result<CliCycle> {
    let mut fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    if allow_private {
        fetcher = fetcher.allow_private_urls();
    }

    Ok(UpdateCycle::new(
        db.source_repo(),
        fetcher,
        ScriptSandbox::new(),
        SnapshotCell::new(),
        StatusPublisher::new(),
    ))
}

async fn cmd_run(allow_private: bool) -> Result<()> {
    let db = connect_db().await?;
    db.settings_repo()
        .init_defaults(&[(
            REFRESH_MINUTES_KEY,
            serde_json::json!(DEFAULT_REFRESH_MINUTES),
        )])
        .await?;

    let cycle = build_cycle(&db, allow_private)?;
    let scheduler = Arc::new(Scheduler::new(cycle, db.settings_repo()));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                cancel.cancel();
            }
        });
    }

    scheduler.run(cancel, &TracingCycleReporter).await;
    Ok(())
}

async fn cmd_update(allow_private: bool, json: bool) -> Result<()> {
    let db = connect_db().await?;
    let cycle = build_cycle(&db, allow_private)?;

    let snapshot = cycle.run_cycle(&TracingCycleReporter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    for result in &snapshot.results {
        match &result.outcome {
            SourceOutcome::Items(items) => println!("{}: {} items", result.name, items.len()),
            SourceOutcome::Error(message) => println!("{}: ERROR {message}", result.name),
        }
    }
    let failed = snapshot.failed_sources();
    if failed > 0 {
        println!("{failed} of {} sources failed", snapshot.results.len());
    }

    Ok(())
}

async fn cmd_source(command: SourceCommands) -> Result<()> {
    let db = connect_db().await?;
    let repo = db.source_repo();

    match command {
        SourceCommands::Add {
            name,
            url,
            script,
            inactive,
        } => {
            let processing = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script file: {}", script.display()))?;
            let id = repo
                .create(&NewSource {
                    name,
                    url,
                    processing,
                    is_active: !inactive,
                })
                .await?;
            println!("{id}");
        }
        SourceCommands::List => {
            for summary in repo.list_summaries().await? {
                let marker = if summary.is_active { "*" } else { " " };
                println!("{marker} {}  {}", summary.id, summary.name);
            }
        }
        SourceCommands::Show { id } => {
            let Some(source) = repo.read(id).await? else {
                bail!("Source not found: {id}");
            };
            println!("name:      {}", source.name);
            println!("url:       {}", source.url);
            println!("active:    {}", source.is_active);
            println!("created:   {}", source.created_at);
            println!("updated:   {}", source.updated_at);
            println!("script:\n{}", source.processing);
        }
        SourceCommands::Rm { id } => {
            repo.delete(id).await?;
            println!("removed {id}");
        }
        SourceCommands::Enable { id } => {
            set_active(&repo, id, true).await?;
            println!("enabled {id}");
        }
        SourceCommands::Disable { id } => {
            set_active(&repo, id, false).await?;
            println!("disabled {id}");
        }
    }

    Ok(())
}

async fn set_active(repo: &SourceRepository, id: Uuid, is_active: bool) -> Result<()> {
    let Some(source) = repo.read(id).await? else {
        bail!("Source not found: {id}");
    };
    repo.update(
        id,
        &NewSource {
            name: source.name,
            url: source.url,
            processing: source.processing,
            is_active,
        },
    )
    .await?;
    Ok(())
}

async fn cmd_interval(minutes: Option<f64>) -> Result<()> {
    let db = connect_db().await?;
    let settings: SettingsRepository = db.settings_repo();

    match minutes {
        None => {
            let current = settings
                .get(REFRESH_MINUTES_KEY)
                .await?
                .and_then(|v| v.as_f64())
                .unwrap_or(DEFAULT_REFRESH_MINUTES);
            println!("{current}");
        }
        Some(m) => {
            if m <= 0.0 {
                bail!("Interval must be positive, got {m}");
            }
            settings
                .set(REFRESH_MINUTES_KEY, serde_json::json!(m))
                .await?;
            println!("refresh interval set to {m} minutes");
        }
    }

    Ok(())
}
