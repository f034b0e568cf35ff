use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repovault::health::CheckResult;
use repovault::manifest::load_manifest;
use repovault::sync::plan;
use repovault::{
    lister, Config, GitCli, HealthCheck, HttpPageFetcher, SyncAction, SyncEngine, SyncOptions,
};

#[derive(Parser)]
#[command(name = "repovault")]
#[command(about = "Back up or update git repositories listed in source.txt")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backup target when no subcommand is given
    #[command(flatten)]
    location: Location,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror or update every repository in the manifest (default)
    Backup {
        #[command(flatten)]
        location: Location,

        /// Seconds to wait between repositories
        #[arg(long)]
        delay: Option<u64>,

        /// Show what would be cloned or updated without running git
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch a GitHub user's repositories into category manifests
    List {
        /// GitHub account to list
        #[arg(long)]
        username: Option<String>,

        /// Directory receiving <username>/<username>.<category>.repo
        #[arg(long)]
        output_path: Option<PathBuf>,
    },

    /// Check git, the sync root and the manifest
    Doctor {
        #[command(flatten)]
        location: Location,
    },
}

#[derive(Args, Clone, Debug, Default)]
struct Location {
    /// Directory that receives the mirrors and the run log
    #[arg(value_name = "SYNC_ROOT")]
    path: Option<PathBuf>,

    /// Same as SYNC_ROOT, as a flag
    #[arg(long = "path", id = "path_flag", value_name = "SYNC_ROOT", conflicts_with = "path")]
    path_flag: Option<PathBuf>,

    /// Directory containing the manifest (defaults to the sync root)
    #[arg(long)]
    repo_path: Option<PathBuf>,
}

impl Location {
    fn sync_root(&self) -> PathBuf {
        self.path
            .clone()
            .or_else(|| self.path_flag.clone())
            .or_else(|| self.repo_path.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn manifest_dir(&self) -> PathBuf {
        self.repo_path.clone().unwrap_or_else(|| self.sync_root())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    init_logging(cli.verbose, &config.logging.level)?;
    info!("Starting repovault v{}", env!("CARGO_PKG_VERSION"));

    // Execute command (default to backup)
    match cli.command {
        None => cmd_backup(cli.location, None, false, &config).await,
        Some(Commands::Backup {
            location,
            delay,
            dry_run,
        }) => cmd_backup(location, delay, dry_run, &config).await,
        Some(Commands::List {
            username,
            output_path,
        }) => cmd_list(username, output_path, &config).await,
        Some(Commands::Doctor { location }) => cmd_doctor(location, &config).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

/// Mirror or update every repository listed in the manifest
async fn cmd_backup(
    location: Location,
    delay: Option<u64>,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let sync_root = location.sync_root();
    let repos = load_manifest(&location.manifest_dir(), &config.sync.manifest_name)?;

    if dry_run {
        println!("🔍 Dry run: {} repositories", repos.len());
        for planned in plan(&repos, &sync_root) {
            println!(
                "   {} {} -> {}",
                planned.action,
                planned.url,
                planned.target.display()
            );
        }
        return Ok(());
    }

    let options = SyncOptions {
        delay: delay
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.sync.delay()),
        progress_width: config.sync.progress_width,
        show_progress: true,
        log_file: config.sync.log_file.clone(),
    };

    let engine = SyncEngine::new(GitCli::new(config.sync.git_binary.clone()), options);
    let summary = engine.run(&repos, &sync_root).await?;

    println!("\n🎉 Backup Complete!");
    println!("   📊 Repositories processed: {}", summary.processed());
    println!("   📥 Cloned: {}", summary.count(SyncAction::Cloning));
    println!("   🔄 Updated: {}", summary.count(SyncAction::Updating));
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    Ok(())
}

/// Write category manifests for a GitHub account
async fn cmd_list(
    username: Option<String>,
    output_path: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let output_root = output_path.unwrap_or_else(|| PathBuf::from(&config.github.output_path));
    let fetcher = HttpPageFetcher::from_config(&config.github)?;

    let summary = lister::list_repositories(
        &fetcher,
        &config.github.api_url,
        config.github.per_page,
        username.as_deref(),
        &output_root,
    )
    .await?;

    println!(
        "Repositories ({}): {} public, {} private, {} fork",
        summary.classified.total(),
        summary.classified.public.len(),
        summary.classified.private.len(),
        summary.classified.fork.len()
    );
    for (category, path) in &summary.files {
        println!("  📁 {:<8} {}", category.as_str(), path.display());
    }

    Ok(())
}

/// System health check and diagnostics
async fn cmd_doctor(location: Location, config: &Config) -> Result<()> {
    let health = HealthCheck::run(config, &location.sync_root(), &location.manifest_dir()).await;
    print_health_report(&health);

    if !health.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}

/// Print health check report to stdout
fn print_health_report(health: &HealthCheck) {
    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning { "⚠️ " } else { "✅" }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 repovault Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(name, result);
        println!();
    }

    let warnings = health.warnings();
    if !warnings.is_empty() {
        println!("⚠️  {} warning(s)", warnings.len());
    }

    if health.all_passed() {
        println!("✅ All checks passed");
    } else {
        println!("❌ Some checks failed");
    }
}
