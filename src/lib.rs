//! repovault - git mirror backups driven by a plain text manifest
//!
//! Two independent flows share one binary:
//!
//! - **backup**: read `source.txt`, then mirror-clone or refresh every listed
//!   repository under a sync root, one at a time, and append a run log line.
//! - **list**: page through a GitHub account's repositories and write them
//!   into `public` / `private` / `fork` category manifests.
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`manifest`]: Manifest parsing and local name derivation
//! - [`git`]: Git capability trait and the git CLI implementation
//! - [`sync`]: Sequential sync loop and run log
//! - [`github`]: Listing API pagination
//! - [`lister`]: Classification and category manifest output
//! - [`health`]: Preflight diagnostics

pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod health;
pub mod lister;
pub mod manifest;
pub mod sync;

pub use config::Config;
pub use error::{SyncAction, VaultError};
pub use git::{GitCli, MirrorOps};
pub use github::{HttpPageFetcher, PageFetcher, RepoRecord};
pub use health::HealthCheck;
pub use lister::{Category, ListSummary};
pub use manifest::RepoRef;
pub use sync::{SyncEngine, SyncOptions, SyncSummary};
