use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use cli::app::App;
use cli::{render, shell};
use quotebook_core::config;
use quotebook_core::sync::{SyncOutcome, MANUAL_SYNC_NOTIFICATION};
use quotebook_core::{CategoryFilter, ConflictPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage::MemoryStore;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    // The process lifetime is the session.
    let app = App::open(cfg, Arc::new(MemoryStore::new())).await?;

    match cli.command {
        Commands::List { category } => run_list(&app, category.as_deref()).await,
        Commands::Categories => run_categories(&app).await,
        Commands::Random => run_random(&app).await,
        Commands::Add {
            text,
            category,
            notify,
        } => run_add(&app, &text, &category, notify).await,
        Commands::Filter { category } => run_filter(&app, &category).await,
        Commands::Export { out } => run_export(&app, out).await,
        Commands::Import { path } => run_import(&app, &path).await,
        Commands::Sync { policy, json } => run_sync(&app, policy.as_deref(), json).await,
        Commands::Post => run_post(&app).await,
        Commands::Watch { interval, policy } => {
            run_watch(&app, interval, policy.as_deref()).await
        }
        Commands::Shell { interval, no_sync } => run_shell(&app, interval, no_sync).await,
    }
}

#[derive(Parser)]
#[command(name = "quotebook")]
#[command(about = "Quote collection with category filters and best-effort server sync", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List quotes, using the remembered filter unless a category is given
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Show known categories
    Categories,
    /// Show a random quote
    Random,
    /// Add a new quote
    Add {
        text: String,
        category: String,
        /// Also post the new quote to the remote endpoint (best effort)
        #[arg(long, default_value_t = false)]
        notify: bool,
    },
    /// Select and remember a category filter (`all` clears it)
    Filter { category: String },
    /// Export all quotes as pretty-printed JSON
    Export {
        /// Output file; defaults to export.file_name from config
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Import quotes from a JSON file
    Import { path: PathBuf },
    /// Fetch from the remote endpoint once and reconcile
    Sync {
        /// Conflict policy: remote-wins|keep-both-if-new
        #[arg(long)]
        policy: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Post the whole quote set to the remote endpoint (best effort)
    Post,
    /// Sync periodically until interrupted
    Watch {
        /// Seconds between cycles; defaults to sync.interval_secs
        #[arg(long)]
        interval: Option<u64>,
        /// Conflict policy: remote-wins|keep-both-if-new
        #[arg(long)]
        policy: Option<String>,
    },
    /// Interactive session with background sync
    Shell {
        /// Seconds between background cycles; defaults to sync.interval_secs
        #[arg(long)]
        interval: Option<u64>,
        /// Disable background sync
        #[arg(long, default_value_t = false)]
        no_sync: bool,
    },
}

fn parse_policy(value: Option<&str>) -> Result<Option<ConflictPolicy>> {
    match value {
        Some(v) => match v.parse::<ConflictPolicy>() {
            Ok(policy) => Ok(Some(policy)),
            Err(e) => bail!(e),
        },
        None => Ok(None),
    }
}

fn interval_or_default(app: &App, secs: Option<u64>) -> Duration {
    secs.map(|s| Duration::from_secs(s.max(1)))
        .unwrap_or_else(|| app.config.sync.interval())
}

async fn run_list(app: &App, category: Option<&str>) -> Result<()> {
    let filter = match category {
        Some(c) => CategoryFilter::parse(c),
        None => app.book.last_filter().await,
    };
    println!("{}", render::quote_list(&app.book.filtered(&filter).await));
    Ok(())
}

async fn run_categories(app: &App) -> Result<()> {
    let selected = app.book.last_filter().await;
    println!(
        "{}",
        render::categories(&app.book.categories().await, &selected)
    );
    Ok(())
}

async fn run_random(app: &App) -> Result<()> {
    match app.book.random().await? {
        Some(record) => println!("{}", render::quote(&record)),
        None => println!("{}", render::NO_QUOTES),
    }
    Ok(())
}

async fn run_add(app: &App, text: &str, category: &str, notify: bool) -> Result<()> {
    let record = app.book.add(text, category).await?;
    println!("Added {}", render::quote(&record));
    if notify {
        // Failures are logged by the sync service and never affect local state.
        let _ = app
            .sync_service(None)
            .notify_remote(std::slice::from_ref(&record))
            .await;
    }
    Ok(())
}

async fn run_filter(app: &App, category: &str) -> Result<()> {
    let filter = CategoryFilter::parse(category);
    app.book.set_filter(&filter).await?;
    println!("{}", render::quote_list(&app.book.filtered(&filter).await));
    Ok(())
}

async fn run_export(app: &App, out: Option<PathBuf>) -> Result<()> {
    let path = out.unwrap_or_else(|| PathBuf::from(&app.config.export.file_name));
    let count = app.export_to(&path).await?;
    println!("Exported {} quotes to {}", count, path.display());
    Ok(())
}

async fn run_import(app: &App, path: &std::path::Path) -> Result<()> {
    let summary = app.import_from(path).await?;
    println!("{}", render::import_summary(&summary));
    Ok(())
}

async fn run_sync(app: &App, policy: Option<&str>, json: bool) -> Result<()> {
    let service = app.sync_service(parse_policy(policy)?);
    let outcome = service.sync_once().await;
    if json {
        let summary = match &outcome {
            SyncOutcome::Applied(report) => serde_json::json!({
                "status": "applied",
                "policy": service.policy().as_str(),
                "fetched": report.fetched,
                "appended": report.appended,
                "replaced": report.replaced,
                "finished_at": report.finished_at.to_rfc3339(),
            }),
            SyncOutcome::Unchanged { fetched } => serde_json::json!({
                "status": "unchanged",
                "policy": service.policy().as_str(),
                "fetched": fetched,
            }),
            other => serde_json::json!({
                "status": "failed",
                "policy": service.policy().as_str(),
                "reason": render::sync_outcome(other),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render::sync_outcome(&outcome));
        println!("{}", MANUAL_SYNC_NOTIFICATION);
    }
    Ok(())
}

async fn run_post(app: &App) -> Result<()> {
    let records = app.book.snapshot().await.into_vec();
    match app.sync_service(None).notify_remote(&records).await {
        Ok(()) => println!("Posted {} quotes to server.", records.len()),
        Err(_) => println!("Server did not accept the quotes; local data unchanged."),
    }
    Ok(())
}

async fn run_watch(app: &App, interval: Option<u64>, policy: Option<&str>) -> Result<()> {
    let every = interval_or_default(app, interval);
    let service = app.sync_service(parse_policy(policy)?);
    info!(interval_secs = every.as_secs(), policy = %service.policy(), "watching remote");
    let handle = service.spawn_periodic(every, |outcome| {
        if let Some(message) = outcome.notification() {
            println!("{}", message);
        }
    });
    tokio::signal::ctrl_c().await?;
    handle.stop().await;
    Ok(())
}

async fn run_shell(app: &App, interval: Option<u64>, no_sync: bool) -> Result<()> {
    let every = (!no_sync).then(|| interval_or_default(app, interval));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    shell::run(app, stdin, &mut stdout, every).await
}
