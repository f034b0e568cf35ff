//! Manifest parsing
//!
//! A manifest is a plain text file (`source.txt` by default) listing one
//! repository URL per line. Blank lines, `#` comments and anything that does
//! not end in `.git` are ignored. The order of the remaining lines is the
//! order in which mirrors are processed.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::VaultError;

const GIT_SUFFIX: &str = ".git";
const COMMENT_MARKER: char = '#';

/// A repository URL taken from the manifest, with its derived local name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    url: String,
    local_name: String,
}

impl RepoRef {
    /// Build a reference from a URL ending in `.git`.
    ///
    /// The local name is the last path segment with the suffix removed and
    /// must be usable as a single directory name.
    pub fn parse(url: &str) -> Result<Self, VaultError> {
        let invalid = || VaultError::InvalidReference {
            line: url.to_string(),
        };

        let stem = url.strip_suffix(GIT_SUFFIX).ok_or_else(invalid)?;
        let local_name = stem.rsplit('/').next().unwrap_or(stem);

        if !is_safe_dir_name(local_name) {
            return Err(invalid());
        }

        Ok(Self {
            url: url.to_string(),
            local_name: local_name.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Directory name for this repository under the sync root
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn target_path(&self, sync_root: &Path) -> PathBuf {
        sync_root.join(&self.local_name)
    }
}

fn is_safe_dir_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0', ':'])
}

/// Lines of the manifest that name a repository, trimmed and in file order
pub fn entry_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .filter(|line| line.ends_with(GIT_SUFFIX))
        .collect()
}

/// Parse manifest text into repository references.
pub fn parse_manifest(content: &str) -> Result<Vec<RepoRef>, VaultError> {
    entry_lines(content).into_iter().map(RepoRef::parse).collect()
}

/// Locate the manifest inside `dir`, failing with `ManifestNotFound`.
pub fn manifest_path(dir: &Path, manifest_name: &str) -> Result<PathBuf, VaultError> {
    let path = dir.join(manifest_name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(VaultError::ManifestNotFound { path })
    }
}

/// Read and parse the manifest named `manifest_name` inside `dir`
pub fn load_manifest(dir: &Path, manifest_name: &str) -> Result<Vec<RepoRef>> {
    let path = manifest_path(dir, manifest_name)?;

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    let repos = parse_manifest(&content)?;
    debug!("Loaded {} entries from {}", repos.len(), path.display());

    for name in duplicate_local_names(&repos) {
        warn!(
            "Multiple manifest entries map to the local directory '{}'; they will overwrite each other",
            name
        );
    }

    Ok(repos)
}

/// Local names used by more than one entry, in first-seen order
pub fn duplicate_local_names(repos: &[RepoRef]) -> Vec<&str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();

    for repo in repos {
        let count = counts.entry(repo.local_name()).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(repo.local_name());
        }
    }

    order
}
