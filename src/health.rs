//! Preflight checks for a backup run
//!
//! Verifies git is callable and the sync root and manifest are where the
//! `backup` command will look for them.

use std::path::Path;

use crate::git::GitCli;
use crate::Config;

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Git installation status
    pub git: CheckResult,
    /// Sync root status
    pub sync_root: CheckResult,
    /// Manifest presence (warning only, `list` can generate one)
    pub manifest: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub async fn run(config: &Config, sync_root: &Path, manifest_dir: &Path) -> Self {
        Self {
            git: Self::check_git(&GitCli::new(config.sync.git_binary.clone())).await,
            sync_root: Self::check_sync_root(sync_root),
            manifest: Self::check_manifest(manifest_dir, &config.sync.manifest_name),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.git.passed && self.sync_root.passed && self.manifest.passed
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        [&self.git, &self.sync_root, &self.manifest]
            .into_iter()
            .filter(|r| r.is_warning)
            .collect()
    }

    async fn check_git(git: &GitCli) -> CheckResult {
        match git.version().await {
            Ok(version) => CheckResult::ok_with_details("Git installed", version),
            Err(e) => CheckResult::error_with_details(
                "Git not available",
                format!("{:#}\nInstall git: https://git-scm.com/downloads", e),
            ),
        }
    }

    fn check_sync_root(path: &Path) -> CheckResult {
        if path.is_dir() {
            CheckResult::ok_with_details("Sync root exists", path.display().to_string())
        } else {
            CheckResult::error_with_details(
                "Sync root does not exist",
                format!("Run: mkdir -p {}", path.display()),
            )
        }
    }

    fn check_manifest(dir: &Path, manifest_name: &str) -> CheckResult {
        match crate::manifest::load_manifest(dir, manifest_name) {
            Ok(repos) => CheckResult::ok_with_details(
                "Manifest found",
                format!("{} repositories listed", repos.len()),
            ),
            Err(e) => CheckResult::warning_with_details(
                "Manifest not usable",
                format!(
                    "{:#}\nCreate {} or run: repovault list --username <name>",
                    e, manifest_name
                ),
            ),
        }
    }

    /// Get all checks as a slice for iteration
    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 3] {
        [
            ("Git Installation", &self.git),
            ("Sync Root", &self.sync_root),
            ("Manifest", &self.manifest),
        ]
    }
}
