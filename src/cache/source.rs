//! Places a cache can be bootstrapped from, tried in order.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{parse_entries, CacheEntry};
use crate::config::CacheConfig;

/// raw.githubusercontent.com throttles requests without a browser agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

#[async_trait]
pub trait CacheSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<Vec<CacheEntry>>;
}

/// The cache file left by a previous run.
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CacheSource for LocalFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Vec<CacheEntry>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        parse_entries(&text)
    }
}

/// A published copy of the cache on one of the repository branches.
pub struct RemoteSource {
    url: String,
    client: Client,
}

impl RemoteSource {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            url,
            client: Client::builder()
                .user_agent(BROWSER_USER_AGENT)
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .context("failed to build HTTP client")?,
        })
    }
}

#[async_trait]
impl CacheSource for RemoteSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn load(&self) -> Result<Vec<CacheEntry>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.url))?;

        if !response.status().is_success() {
            bail!("HTTP {} from {}", response.status(), self.url);
        }

        let text = response.text().await.context("Failed to read cache body")?;
        parse_entries(&text)
    }
}

/// Local file first, then each configured mirror.
pub fn default_sources(
    root: &Path,
    config: &CacheConfig,
    timeout_secs: u64,
) -> Result<Vec<Box<dyn CacheSource>>> {
    let mut sources: Vec<Box<dyn CacheSource>> =
        vec![Box::new(LocalFileSource::new(root.join(&config.path)))];
    for url in &config.fallback_urls {
        sources.push(Box::new(RemoteSource::new(url.clone(), timeout_secs)?));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ONE_ENTRY: &str =
        r#"[{"rating": 4, "description": "d", "tags": ["t"], "sha1": "f", "rawPath": "a"}]"#;

    #[tokio::test]
    async fn test_local_source_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache-presets.json");
        std::fs::write(&path, ONE_ENTRY).unwrap();

        let entries = LocalFileSource::new(&path).load().await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_local_source_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let source = LocalFileSource::new(dir.path().join("absent.json"));
        assert!(source.load().await.is_err());
    }

    #[tokio::test]
    async fn test_remote_source_sends_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/cache-presets.json")
            .match_header("user-agent", BROWSER_USER_AGENT)
            .with_status(200)
            .with_body(ONE_ENTRY)
            .create_async()
            .await;

        let source = RemoteSource::new(format!("{}/cache-presets.json", server.url()), 10).unwrap();
        assert_eq!(source.load().await.unwrap().len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_source_http_error_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/cache-presets.json")
            .with_status(404)
            .create_async()
            .await;

        let source = RemoteSource::new(format!("{}/cache-presets.json", server.url()), 10).unwrap();
        let err = source.load().await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_default_sources_order() {
        let config = CacheConfig::default();
        let sources = default_sources(Path::new("/repo"), &config, 10).unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].describe(), "/repo/cache-presets.json");
        assert!(sources[1].describe().contains("refs/heads/preset"));
        assert!(sources[2].describe().contains("refs/heads/main"));
    }
}
