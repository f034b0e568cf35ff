use std::fmt;
use std::path::PathBuf;

/// What the sync loop was doing to a mirror when it ran git
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// No local mirror yet, `git clone --mirror`
    Cloning,
    /// Local mirror exists, `git remote update`
    Updating,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Cloning => f.write_str("Cloning"),
            SyncAction::Updating => f.write_str("Updating"),
        }
    }
}

/// Fatal conditions that end a run.
///
/// Every variant carries the input that caused it so the user can see which
/// path, account or reference to fix.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("manifest not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("no GitHub username given (use --username)")]
    MissingIdentifier,

    #[error("invalid GitHub username: {account}")]
    InvalidIdentifier { account: String },

    #[error("invalid repository reference: {line}")]
    InvalidReference { line: String },

    #[error("failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("{action} {reference} failed: {detail}")]
    ExternalOperationFailure {
        action: SyncAction,
        reference: String,
        detail: String,
    },
}
