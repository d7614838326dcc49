//! Storage for finished counting runs and per-term article sets.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::form_urlencoded;

use litscan_common::config::StorageConfig;
use litscan_common::{LitscanError, Result};

use crate::articles::TermGroupArticleSet;
use crate::counts::CountsSnapshot;

/// Something previously saved under a name.
#[derive(Debug, Clone, PartialEq)]
pub enum Stored {
    Counts(CountsSnapshot),
    Articles(TermGroupArticleSet),
}

/// Storage collaborator for both result categories.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a counting run under `name`.
    async fn save_counts(&self, name: &str, counts: &CountsSnapshot) -> Result<()>;

    /// Persist one term group's articles under its label.
    async fn save_articles(&self, label: &str, set: &TermGroupArticleSet) -> Result<()>;

    async fn load_counts(&self, name: &str) -> Result<CountsSnapshot>;

    async fn load_articles(&self, label: &str) -> Result<TermGroupArticleSet>;

    /// Look `name` up among counts first, then articles.
    async fn load(&self, name: &str) -> Result<Stored> {
        match self.load_counts(name).await {
            Ok(counts) => return Ok(Stored::Counts(counts)),
            Err(LitscanError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        match self.load_articles(name).await {
            Ok(set) => Ok(Stored::Articles(set)),
            Err(LitscanError::NotFound(_)) => Err(LitscanError::NotFound(format!(
                "'{name}' is in neither the counts nor the words store"
            ))),
            Err(e) => Err(e),
        }
    }
}

/// JSON documents on disk, one directory per category.
#[derive(Debug, Clone)]
pub struct FileStore {
    counts_dir: PathBuf,
    words_dir: PathBuf,
}

impl FileStore {
    pub fn new(counts_dir: impl Into<PathBuf>, words_dir: impl Into<PathBuf>) -> Self {
        Self { counts_dir: counts_dir.into(), words_dir: words_dir.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.counts_path, &config.words_path)
    }

    /// Names are percent-encoded, so distinct labels never share a file.
    fn file_in(dir: &Path, name: &str) -> PathBuf {
        let stem: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
        dir.join(format!("{stem}.json"))
    }

    async fn write_json<T: Serialize + Sync>(dir: &Path, name: &str, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        let path = Self::file_in(dir, name);
        let body = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&path, body).await?;
        debug!(path = %path.display(), "Saved");
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
        let path = Self::file_in(dir, name);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LitscanError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn save_counts(&self, name: &str, counts: &CountsSnapshot) -> Result<()> {
        Self::write_json(&self.counts_dir, name, counts).await?;
        info!(name, "Saved counts");
        Ok(())
    }

    async fn save_articles(&self, label: &str, set: &TermGroupArticleSet) -> Result<()> {
        Self::write_json(&self.words_dir, label, set).await
    }

    async fn load_counts(&self, name: &str) -> Result<CountsSnapshot> {
        Self::read_json(&self.counts_dir, name).await
    }

    async fn load_articles(&self, label: &str) -> Result<TermGroupArticleSet> {
        Self::read_json(&self.words_dir, label).await
    }
}
