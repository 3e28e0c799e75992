use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cardbook::config::{default_config_path, ResolvedConfig};
use cardbook::credentials::{
    BrowserLogin, CachedSession, EnvCookieSession, LoginCredentials, SessionCache,
    SessionProvider,
};
use cardbook::duration::format_duration;
use cardbook::format::format_amount;
use cardbook::provider::{BankClient, RetryPolicy};
use cardbook::reconcile::Reconciler;
use cardbook::report::{self, Marker};
use cardbook::storage::{JsonSnapshotStore, SnapshotStore};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SESSION_CACHE_KEY: &str = "default";

#[derive(Parser)]
#[command(name = "cardbook")]
#[command(about = "Credit-card reconciliation: unbilled, installments and recurring charges")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile every card and save a snapshot (default)
    Run(RunArgs),
    /// Print the latest snapshot
    Show,
    /// List archived snapshots
    History,
    /// Show the resolved configuration
    Config,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Use the cookie header in this environment variable instead of logging in
    #[arg(long, value_name = "VAR")]
    cookie_env: Option<String>,

    /// Ignore any cached session and log in again
    #[arg(long)]
    fresh_login: bool,

    /// Run the login browser without a window
    #[arg(long)]
    headless: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,chromiumoxide=warn,chromiumoxide::conn=off,chromiumoxide::handler=off")
    });
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load cardbook config: {}", cli.config.display()))?;

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run(&config, args).await,
        Command::Show => show(&config).await,
        Command::History => history(&config).await,
        Command::Config => {
            print_config(&cli.config, &config);
            Ok(())
        }
    }
}

async fn acquire_session(
    config: &ResolvedConfig,
    args: &RunArgs,
) -> Result<cardbook::credentials::SessionData> {
    if let Some(var) = &args.cookie_env {
        return EnvCookieSession::new(var).acquire().await;
    }

    let cache = SessionCache::new()?;
    if args.fresh_login {
        cache.delete(SESSION_CACHE_KEY)?;
    }
    let login = BrowserLogin::new(&config.provider.login_url, LoginCredentials::from_env()?)
        .headless(args.headless);

    CachedSession::new(login, cache, config.session.max_age)
        .with_key(SESSION_CACHE_KEY)
        .acquire()
        .await
}

async fn run(config: &ResolvedConfig, args: RunArgs) -> Result<()> {
    println!("{}", report::render_line(0, Marker::Step, "Logging in"));
    let session = acquire_session(config, &args)
        .await
        .context("Authentication failed")?;

    let client = BankClient::new(session, &config.provider.base_url)?
        .with_retry(RetryPolicy::from_config(&config.provider.retry));
    let reconciler = Reconciler::from_config(Arc::new(client), config);
    let store = JsonSnapshotStore::new(&config.results_dir);

    println!("{}", report::render_line(0, Marker::Step, "Reconciling cards"));
    let (snapshot, saved) = reconciler.run_and_save(&store).await?;

    for line in report::render_snapshot(&snapshot, &config.display) {
        println!("{line}");
    }
    println!(
        "{}",
        report::render_line(
            0,
            Marker::Step,
            &format!("Saved {}", saved.latest.display())
        )
    );
    if let Some(archived) = saved.archived {
        println!(
            "{}",
            report::render_line(
                1,
                Marker::Result,
                &format!("Previous snapshot archived as {}", archived.display())
            )
        );
    }
    Ok(())
}

async fn show(config: &ResolvedConfig) -> Result<()> {
    let store = JsonSnapshotStore::new(&config.results_dir);
    match store.latest().await? {
        Some(snapshot) => {
            for line in report::render_snapshot(&snapshot, &config.display) {
                println!("{line}");
            }
        }
        None => println!(
            "{}",
            report::render_line(
                0,
                Marker::Warning,
                &format!("No snapshot in {}", config.results_dir.display())
            )
        ),
    }
    Ok(())
}

async fn history(config: &ResolvedConfig) -> Result<()> {
    let store = JsonSnapshotStore::new(&config.results_dir);
    let archives = store.archives().await?;
    if archives.is_empty() {
        println!("{}", report::render_line(0, Marker::Warning, "No archived snapshots"));
        return Ok(());
    }

    for archive in &archives {
        let snapshot = store.read_archive(archive).await?;
        println!(
            "{}",
            report::render_line(
                0,
                Marker::Result,
                &format!(
                    "{}  {}",
                    archive.name,
                    format_amount(snapshot.totals.grand_total, &config.display)
                )
            )
        );
    }
    Ok(())
}

fn print_config(path: &std::path::Path, config: &ResolvedConfig) {
    println!("Config file: {}", path.display());
    println!("Data directory: {}", config.data_dir.display());
    println!("Results directory: {}", config.results_dir.display());
    println!("Timezone: {}", config.timezone);
    println!("Provider: {}", config.provider.base_url);
    println!("Login: {}", config.provider.login_url);
    println!(
        "Retry: {} attempt(s), initial backoff {}",
        config.provider.retry.max_attempts,
        format_duration(config.provider.retry.initial_backoff)
    );
    println!(
        "Matching: {:?} (tolerance {})",
        config.matching.policy, config.matching.amount_tolerance
    );
    println!("Session max age: {}", format_duration(config.session.max_age));
    println!("Isolate card failures: {}", config.run.isolate_card_failures);
    println!("Fixed expenses:");
    for expense in &config.fixed_expenses {
        println!("  {}: {}", expense.name, format_amount(expense.amount, &config.display));
    }
    println!(
        "  total: {}",
        format_amount(config.fixed_expenses_total(), &config.display)
    );
}
