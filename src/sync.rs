//! Sync Engine - walks a manifest and mirrors each repository in turn
//!
//! Entries are processed strictly in manifest order. A missing local
//! directory means the repository is cloned as a mirror, an existing one is
//! refreshed with `git remote update`. The first failing git operation ends
//! the run; only a fully successful run appends a line to the run log.

use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{SyncAction, VaultError};
use crate::git::MirrorOps;
use crate::manifest::RepoRef;

/// Outcome of mirroring a single manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub local_name: String,
    pub action: SyncAction,
    pub elapsed: Duration,
}

/// Results from a complete sync run
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub items: Vec<SyncItem>,
    pub duration: Duration,
}

impl SyncSummary {
    pub fn processed(&self) -> usize {
        self.items.len()
    }

    pub fn count(&self, action: SyncAction) -> usize {
        self.items.iter().filter(|item| item.action == action).count()
    }
}

/// A planned operation for one entry, as shown by a dry run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSync {
    pub url: String,
    pub target: PathBuf,
    pub action: SyncAction,
}

/// Tunables for a sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Pause after every entry to stay under the remote host's rate limits
    pub delay: Duration,
    pub progress_width: usize,
    pub show_progress: bool,
    /// Run log file name inside the sync root
    pub log_file: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            progress_width: 30,
            show_progress: true,
            log_file: "update-log.txt".to_string(),
        }
    }
}

/// Decide between clone and update purely from local filesystem state
pub fn choose_action(target: &Path) -> SyncAction {
    if target.exists() {
        SyncAction::Updating
    } else {
        SyncAction::Cloning
    }
}

/// Actions a run would take, without touching git
pub fn plan(repos: &[RepoRef], sync_root: &Path) -> Vec<PlannedSync> {
    repos
        .iter()
        .map(|repo| {
            let target = repo.target_path(sync_root);
            PlannedSync {
                url: repo.url().to_string(),
                action: choose_action(&target),
                target,
            }
        })
        .collect()
}

/// The line appended to the run log after a completed run
pub fn format_log_line(timestamp: &str, processed: usize, duration: Duration) -> String {
    format!(
        "Backup completed at {}, {} repositories processed. lasts {:.3} seconds",
        timestamp,
        processed,
        duration.as_secs_f64()
    )
}

/// `indicatif` template for a bar `width` columns wide
pub fn progress_template(width: usize) -> String {
    format!("[{{bar:{}}}] {{pos}}/{{len}} {{msg}}", width)
}

/// Sequential mirror engine over a `MirrorOps` implementation
pub struct SyncEngine<G> {
    git: G,
    options: SyncOptions,
}

impl<G: MirrorOps> SyncEngine<G> {
    pub fn new(git: G, options: SyncOptions) -> Self {
        Self { git, options }
    }

    /// Mirror every entry of `repos` under `sync_root`, then append the run log
    pub async fn run(&self, repos: &[RepoRef], sync_root: &Path) -> Result<SyncSummary> {
        let start_time = Instant::now();
        let total = repos.len();

        info!(
            "Starting backup of {} repositories into {}",
            total,
            sync_root.display()
        );

        let progress = self.progress_bar(total);
        let mut summary = SyncSummary::default();

        for repo in repos {
            let item = self.sync_one(repo, sync_root, &progress).await?;

            progress.inc(1);
            progress.set_message(format!(
                "{} ({:.2}s)",
                item.local_name,
                item.elapsed.as_secs_f64()
            ));
            progress.suspend(|| {
                info!(
                    "[{}/{}] {} done in {:.2}s",
                    summary.processed() + 1,
                    total,
                    item.local_name,
                    item.elapsed.as_secs_f64()
                )
            });
            summary.items.push(item);

            if !self.options.delay.is_zero() {
                tokio::time::sleep(self.options.delay).await;
            }
        }

        progress.finish();
        summary.duration = start_time.elapsed();

        self.append_run_log(sync_root, &summary)?;

        info!(
            "Backup completed in {:.2}s: {} cloned, {} updated",
            summary.duration.as_secs_f64(),
            summary.count(SyncAction::Cloning),
            summary.count(SyncAction::Updating)
        );

        Ok(summary)
    }

    async fn sync_one(
        &self,
        repo: &RepoRef,
        sync_root: &Path,
        progress: &ProgressBar,
    ) -> Result<SyncItem> {
        let target = repo.target_path(sync_root);
        let action = choose_action(&target);
        let started = Instant::now();

        progress.suspend(|| info!("{} {} in {}", action, repo.url(), target.display()));

        let result = match action {
            SyncAction::Cloning => self.git.clone_mirror(repo.url(), &target).await,
            SyncAction::Updating => self.git.update_mirror(&target).await,
        };

        if let Err(e) = result {
            progress.abandon();
            return Err(VaultError::ExternalOperationFailure {
                action,
                reference: repo.url().to_string(),
                detail: format!("{:#}", e),
            }
            .into());
        }

        Ok(SyncItem {
            local_name: repo.local_name().to_string(),
            action,
            elapsed: started.elapsed(),
        })
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        // An empty run draws nothing, so no ratio is ever computed over zero
        if !self.options.show_progress || total == 0 {
            return ProgressBar::hidden();
        }

        let template = progress_template(self.options.progress_width);
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar
    }

    fn append_run_log(&self, sync_root: &Path, summary: &SyncSummary) -> Result<()> {
        let log_path = sync_root.join(&self.options.log_file);
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let line = format_log_line(&timestamp, summary.processed(), summary.duration);

        debug!("Appending to run log {}", log_path.display());

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open run log: {}", log_path.display()))?;

        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to write run log: {}", log_path.display()))?;

        Ok(())
    }
}
