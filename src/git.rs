use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// Git operations the sync loop needs.
///
/// The sync engine only talks to git through this trait so the loop can run
/// against a fake in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MirrorOps: Send + Sync {
    /// Create a bare mirror of `url` at `target`
    async fn clone_mirror(&self, url: &str, target: &Path) -> Result<()>;

    /// Fetch all refs for the mirror at `path`
    async fn update_mirror(&self, path: &Path) -> Result<()>;
}

/// `MirrorOps` backed by the git executable
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
}

impl GitCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&OsStr], cwd: Option<&Path>) -> Result<()> {
        debug!("Running {} {:?}", self.binary, args);

        let mut command = AsyncCommand::new(&self.binary);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "git exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }

    /// Version string reported by the git binary
    pub async fn version(&self) -> Result<String> {
        let output = AsyncCommand::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", self.binary))?;

        if !output.status.success() {
            return Err(anyhow!("{} --version failed", self.binary));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl MirrorOps for GitCli {
    async fn clone_mirror(&self, url: &str, target: &Path) -> Result<()> {
        let args = [
            OsStr::new("clone"),
            OsStr::new("--mirror"),
            OsStr::new(url),
            target.as_os_str(),
        ];
        self.run(&args, None).await
    }

    async fn update_mirror(&self, path: &Path) -> Result<()> {
        let args = [OsStr::new("remote"), OsStr::new("update")];
        self.run(&args, Some(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let git = GitCli::new("definitely-not-a-git-binary");
        let temp_dir = TempDir::new().unwrap();

        let result = git.update_mirror(temp_dir.path()).await;
        assert!(result.is_err());
        assert!(git.version().await.is_err());
    }

    #[tokio::test]
    async fn test_clone_mirror_of_local_repository() {
        let git = GitCli::default();
        if git.version().await.is_err() {
            // git is not installed here, nothing to exercise
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        std::fs::create_dir(&source).unwrap();
        let init = std::process::Command::new("git")
            .args(["init", "--bare", "--quiet"])
            .current_dir(&source)
            .status()
            .unwrap();
        assert!(init.success());

        let target = temp_dir.path().join("mirror");
        git.clone_mirror(source.to_str().unwrap(), &target)
            .await
            .unwrap();
        assert!(target.join("HEAD").exists());

        git.update_mirror(&target).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_outside_repository_fails() {
        let git = GitCli::default();
        if git.version().await.is_err() {
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let result = git.update_mirror(temp_dir.path()).await;
        assert!(result.is_err());
    }
}
