//! Repository lister
//!
//! Fetches every repository of a GitHub account and writes them into
//! category manifests (`<account>.public.repo`, `<account>.private.repo`,
//! `<account>.fork.repo`) that can be fed back into a backup run.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::VaultError;
use crate::github::{fetch_all, listing_url, PageFetcher, RepoRecord};

const NO_DESCRIPTION: &str = "No description";
const MAX_LOGIN_LEN: usize = 39;

/// Output bucket for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Public,
    Private,
    Fork,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Public, Category::Private, Category::Fork];

    /// Forks go to `Fork` whatever their visibility
    pub fn of(record: &RepoRecord) -> Self {
        if record.fork {
            Category::Fork
        } else if record.private {
            Category::Private
        } else {
            Category::Public
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Public => "public",
            Category::Private => "private",
            Category::Fork => "fork",
        }
    }

    pub fn file_name(&self, account: &str) -> String {
        format!("{}.{}.repo", account, self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records split by category, each keeping server order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub public: Vec<RepoRecord>,
    pub private: Vec<RepoRecord>,
    pub fork: Vec<RepoRecord>,
}

impl Classified {
    pub fn get(&self, category: Category) -> &[RepoRecord] {
        match category {
            Category::Public => &self.public,
            Category::Private => &self.private,
            Category::Fork => &self.fork,
        }
    }

    pub fn total(&self) -> usize {
        self.public.len() + self.private.len() + self.fork.len()
    }
}

pub fn classify(records: Vec<RepoRecord>) -> Classified {
    let mut classified = Classified::default();

    for record in records {
        match Category::of(&record) {
            Category::Public => classified.public.push(record),
            Category::Private => classified.private.push(record),
            Category::Fork => classified.fork.push(record),
        }
    }

    classified
}

/// GitHub logins: ASCII alphanumerics and single inner hyphens
pub fn is_valid_login(account: &str) -> bool {
    account.len() <= MAX_LOGIN_LEN
        && !account.starts_with('-')
        && !account.ends_with('-')
        && account.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Descriptions sit on a `#` line, so line breaks are folded into spaces
fn comment_text(description: Option<&str>) -> String {
    let flattened = description
        .unwrap_or_default()
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if flattened.is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        flattened
    }
}

/// Manifest text for one category: comment header lines then the clone URL,
/// blocks separated by a blank line
pub fn render_category(records: &[RepoRecord]) -> String {
    records
        .iter()
        .map(|record| {
            format!(
                "# {}\n# {}\n# {}\n{}\n",
                comment_text(record.description.as_deref()),
                record.name,
                record.html_url,
                record.clone_url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write one file per non-empty category into `dir`, returning what was written
pub fn write_category_manifests(
    dir: &Path,
    account: &str,
    classified: &Classified,
) -> Result<Vec<(Category, PathBuf)>> {
    let mut written = Vec::new();

    for category in Category::ALL {
        let records = classified.get(category);
        if records.is_empty() {
            debug!("No {} repositories, skipping file", category);
            continue;
        }

        let path = dir.join(category.file_name(account));
        std::fs::write(&path, render_category(records))
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Wrote {} {} repositories to {}", records.len(), category, path.display());
        written.push((category, path));
    }

    Ok(written)
}

/// Result of a list run
#[derive(Debug, Clone)]
pub struct ListSummary {
    pub output_dir: PathBuf,
    pub classified: Classified,
    pub files: Vec<(Category, PathBuf)>,
}

/// Fetch all repositories of `account` and write its category manifests
/// under `output_root/account`
pub async fn list_repositories<F: PageFetcher + ?Sized>(
    fetcher: &F,
    api_url: &str,
    per_page: u32,
    account: Option<&str>,
    output_root: &Path,
) -> Result<ListSummary> {
    let account = account
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or(VaultError::MissingIdentifier)?;

    if !is_valid_login(account) {
        return Err(VaultError::InvalidIdentifier {
            account: account.to_string(),
        }
        .into());
    }

    let output_dir = output_root.join(account);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let first_page = listing_url(api_url, account, per_page);
    info!("Listing repositories for {}", account);

    let records = fetch_all(fetcher, &first_page).await?;
    let classified = classify(records);
    let files = write_category_manifests(&output_dir, account, &classified)?;

    Ok(ListSummary {
        output_dir,
        classified,
        files,
    })
}
