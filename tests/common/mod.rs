//! Common test utilities and helpers for repovault tests
#![allow(dead_code)]

use assert_fs::prelude::*;
use assert_fs::TempDir;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Output;

/// Scratch directories plus a config file isolating the binary from the user's setup
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub sync_root: PathBuf,
    pub config_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_config("sync:\n  delay_secs: 0\n")
    }

    pub fn with_config(content: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sync_root = temp_dir.child("mirrors");
        sync_root.create_dir_all().expect("Failed to create sync root");

        let config = temp_dir.child("config.yml");
        config.write_str(content).expect("Failed to write test config");

        Self {
            sync_root: sync_root.path().to_path_buf(),
            config_path: config.path().to_path_buf(),
            temp_dir,
        }
    }

    pub fn write_manifest(&self, content: &str) -> PathBuf {
        let path = self.sync_root.join("source.txt");
        std::fs::write(&path, content).expect("Failed to write manifest");
        path
    }

    /// Run the compiled binary with the test config and a sandboxed home
    pub async fn run(&self, args: &[&str]) -> Output {
        tokio::process::Command::new(env!("CARGO_BIN_EXE_repovault"))
            .arg("--config")
            .arg(&self.config_path)
            .args(args)
            .env("XDG_CONFIG_HOME", self.temp_dir.path())
            .env("HOME", self.temp_dir.path())
            .env_remove("GITHUB_TOKEN")
            .env_remove("RUST_LOG")
            .output()
            .await
            .expect("Failed to execute repovault")
    }

    pub fn path_arg(&self, path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }
}

/// Mock GitHub repository data for listing tests
#[derive(Debug, Clone)]
pub struct MockRepository {
    pub name: String,
    pub owner: String,
    pub description: Option<String>,
    pub is_fork: bool,
    pub is_private: bool,
}

impl MockRepository {
    pub fn new(name: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
            description: Some(format!("The {} project", name)),
            is_fork: false,
            is_private: false,
        }
    }

    pub fn without_description(mut self) -> Self {
        self.description = None;
        self
    }

    pub fn as_fork(mut self) -> Self {
        self.is_fork = true;
        self
    }

    pub fn as_private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// JSON shaped like an entry of `GET /users/{user}/repos`
    pub fn to_json(&self) -> Value {
        json!({
            "id": 1,
            "name": self.name,
            "full_name": format!("{}/{}", self.owner, self.name),
            "description": self.description,
            "html_url": format!("https://github.com/{}/{}", self.owner, self.name),
            "clone_url": format!("https://github.com/{}/{}.git", self.owner, self.name),
            "private": self.is_private,
            "fork": self.is_fork,
            "size": 120
        })
    }
}

pub fn page_body(repos: &[MockRepository]) -> Value {
    Value::Array(repos.iter().map(MockRepository::to_json).collect())
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
