use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::GitHubConfig;
use crate::error::VaultError;

/// One repository as returned by the GitHub listing API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepoRecord {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    pub clone_url: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
}

/// A single page of the listing and the URL of the page after it
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<RepoRecord>,
    pub next: Option<String>,
}

/// Source of listing pages.
///
/// Implemented over HTTP for real runs; tests feed canned pages instead.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<Page>;
}

/// First page URL of the public repository listing for `account`
pub fn listing_url(api_url: &str, account: &str, per_page: u32) -> String {
    format!(
        "{}/users/{}/repos?per_page={}",
        api_url.trim_end_matches('/'),
        account,
        per_page
    )
}

/// Extract the `rel="next"` target from a `Link` header value.
///
/// The header looks like `<url1>; rel="next", <url2>; rel="last"`.
pub fn parse_next_link(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });

        if !is_next {
            return None;
        }

        let url = target.trim_start_matches('<').trim_end_matches('>').trim();
        (!url.is_empty()).then(|| url.to_string())
    })
}

/// Follow `next` links from `first_url` and collect every record in server order
pub async fn fetch_all<F: PageFetcher + ?Sized>(
    fetcher: &F,
    first_url: &str,
) -> Result<Vec<RepoRecord>> {
    let mut records = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(first_url.to_string());

    while let Some(url) = next.take() {
        if !visited.insert(url.clone()) {
            warn!("Pagination loops back to {}, stopping", url);
            break;
        }

        let page = fetcher.fetch_page(&url).await?;
        debug!("Fetched {} records from {}", page.records.len(), url);

        records.extend(page.records);
        next = page.next;
    }

    info!("Fetched {} repositories in {} pages", records.len(), visited.len());
    Ok(records)
}

/// `PageFetcher` talking to the GitHub REST API
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(concat!("repovault/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &GitHubConfig) -> Result<Self> {
        let token = config.resolve_token();
        if token.is_some() {
            debug!("Using GitHub token for listing requests");
        }
        Self::new(token.as_deref())
    }
}

fn fetch_failure(url: &str, reason: impl Into<String>) -> VaultError {
    VaultError::FetchFailure {
        url: url.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<Page> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failure(url, e.to_string()))?;

        let status = response.status();
        let next = response
            .headers()
            .get(header::LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_next_link);

        let body = response
            .text()
            .await
            .map_err(|e| fetch_failure(url, e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(fetch_failure(url, format!("HTTP {}: {}", status, message)).into());
        }

        let records = parse_listing(&body).map_err(|reason| fetch_failure(url, reason))?;

        Ok(Page { records, next })
    }
}

/// Decode a page body, rejecting anything that is not an array of repositories
pub fn parse_listing(body: &str) -> std::result::Result<Vec<RepoRecord>, String> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| format!("invalid JSON: {}", e))?;

    if !value.is_array() {
        return Err("response is not a repository listing".to_string());
    }

    serde_json::from_value(value).map_err(|e| format!("unexpected repository record: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct CannedPages(HashMap<String, Page>);

    #[async_trait]
    impl PageFetcher for CannedPages {
        async fn fetch_page(&self, url: &str) -> Result<Page> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| fetch_failure(url, "no such page").into())
        }
    }

    fn record(name: &str) -> RepoRecord {
        RepoRecord {
            name: name.to_string(),
            description: None,
            html_url: format!("https://github.com/u/{}", name),
            clone_url: format!("https://github.com/u/{}.git", name),
            private: false,
            fork: false,
        }
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(
            listing_url("https://api.github.com/", "octocat", 100),
            "https://api.github.com/users/octocat/repos?per_page=100"
        );
    }

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://api.github.com/user/1/repos?page=2>; rel="next", <https://api.github.com/user/1/repos?page=5>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/user/1/repos?page=2")
        );
    }

    #[test]
    fn test_parse_next_link_not_first() {
        let header = r#"<https://x/repos?page=1>; rel="prev", <https://x/repos?page=3>; rel="next""#;
        assert_eq!(parse_next_link(header).as_deref(), Some("https://x/repos?page=3"));
    }

    #[test]
    fn test_parse_next_link_absent() {
        let header = r#"<https://x/repos?page=1>; rel="first", <https://x/repos?page=2>; rel="prev""#;
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn test_parse_listing_rejects_objects() {
        let err = parse_listing(r#"{"message": "Not Found"}"#).unwrap_err();
        assert!(err.contains("not a repository listing"));
        assert!(parse_listing("not json").is_err());
    }

    #[test]
    fn test_parse_listing_ignores_extra_fields() {
        let body = r#"[{"id": 1, "name": "app", "description": null,
            "html_url": "https://github.com/u/app", "clone_url": "https://github.com/u/app.git",
            "private": true, "fork": false, "stargazers_count": 3}]"#;
        let records = parse_listing(body).unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].private);
        assert_eq!(records[0].description, None);
    }

    #[tokio::test]
    async fn test_fetch_all_follows_next_in_order() {
        let mut pages = HashMap::new();
        pages.insert(
            "p1".to_string(),
            Page {
                records: vec![record("a"), record("b")],
                next: Some("p2".to_string()),
            },
        );
        pages.insert(
            "p2".to_string(),
            Page {
                records: vec![record("c")],
                next: Some("p3".to_string()),
            },
        );
        pages.insert(
            "p3".to_string(),
            Page {
                records: vec![record("d")],
                next: None,
            },
        );

        let records = fetch_all(&CannedPages(pages), "p1").await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_fetch_all_fails_on_missing_page() {
        let mut pages = HashMap::new();
        pages.insert(
            "p1".to_string(),
            Page {
                records: vec![record("a")],
                next: Some("gone".to_string()),
            },
        );

        let err = fetch_all(&CannedPages(pages), "p1").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::FetchFailure { url, .. }) if url == "gone"
        ));
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_link_cycle() {
        let mut pages = HashMap::new();
        pages.insert(
            "p1".to_string(),
            Page {
                records: vec![record("a")],
                next: Some("p1".to_string()),
            },
        );

        let records = fetch_all(&CannedPages(pages), "p1").await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
