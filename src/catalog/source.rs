use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned {0}")]
    Status(u16),
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no TLE files in {0}")]
    Empty(String),
}

/// Where a category's element sets come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLocation {
    Url(String),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub category: String,
    #[serde(flatten)]
    pub location: SourceLocation,
    /// stop adding records of this category once reached
    #[serde(default)]
    pub max_count: Option<usize>,
}

/// A feed of raw three-line element text.
#[async_trait]
pub trait TleSource: Send + Sync {
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<String, FeedError>;
}

pub struct HttpTleSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTleSource {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl TleSource for HttpTleSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String, FeedError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// A single `.tle`/`.txt` file, or every such file in a folder.
pub struct FileTleSource {
    path: PathBuf,
}

impl FileTleSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

fn has_tle_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "tle" || ext == "txt")
        .unwrap_or(false)
}

#[async_trait]
impl TleSource for FileTleSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, FeedError> {
        if tokio::fs::metadata(&self.path).await?.is_file() {
            return Ok(tokio::fs::read_to_string(&self.path).await?);
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !has_tle_extension(&path) {
                continue;
            }
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        if files.is_empty() {
            return Err(FeedError::Empty(self.describe()));
        }
        files.sort();

        let mut content = String::new();
        for file in files {
            match tokio::fs::read_to_string(&file).await {
                Ok(text) => {
                    content.push_str(&text);
                    content.push('\n');
                }
                Err(e) => log::warn!("Failed to read TLE file {}: {}", file.display(), e),
            }
        }
        Ok(content)
    }
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("sat-o-view/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Instantiate the configured sources.
pub fn open_sources(
    configs: &[SourceConfig],
    client: &reqwest::Client,
) -> Vec<(SourceConfig, Box<dyn TleSource>)> {
    configs
        .iter()
        .map(|config| {
            let source: Box<dyn TleSource> = match &config.location {
                SourceLocation::Url(url) => {
                    Box::new(HttpTleSource::new(client.clone(), url.clone()))
                }
                SourceLocation::Path(path) => Box::new(FileTleSource::new(path.clone())),
            };
            (config.clone(), source)
        })
        .collect()
}
