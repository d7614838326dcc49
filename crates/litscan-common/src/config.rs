//! Scrape configuration.
//!
//! Configuration is an explicit value: it is loaded from a path the caller
//! names and handed to the orchestrator at construction. Nothing here falls
//! back to a built-in filesystem location.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{LitscanError, Result};

pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";

/// Complete configuration for a scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Remote search service settings
    #[serde(default)]
    pub eutils: EutilsConfig,

    /// HTTP behaviour
    #[serde(default)]
    pub requests: RequestConfig,

    /// Where results are persisted. Required.
    pub storage: StorageConfig,

    /// Counting mode options
    #[serde(default)]
    pub counts: CountsConfig,

    /// Retrieval mode options
    #[serde(default)]
    pub words: WordsConfig,

    /// Term group files
    #[serde(default)]
    pub terms: TermsConfig,
}

// ── Remote service ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EutilsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_db")]
    pub db: String,
    /// Restrict searches to a document field (e.g. "TIAB" for title/abstract).
    #[serde(default = "default_field")]
    pub field: Option<String>,
    #[serde(default = "default_retmode")]
    pub retmode: String,
}

fn default_base_url() -> String { EUTILS_BASE_URL.to_string() }
fn default_db()       -> String { "pubmed".to_string() }
fn default_field()    -> Option<String> { Some("TIAB".to_string()) }
fn default_retmode()  -> String { "xml".to_string() }

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            db: default_db(),
            field: default_field(),
            retmode: default_retmode(),
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 0 disables throttling.
    #[serde(default = "default_rps")]
    pub requests_per_second: f64,
    /// Hosts allowed in addition to the base URL host.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

fn default_timeout_secs() -> u64 { 30 }
fn default_rps()          -> f64 { 3.0 }

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            requests_per_second: default_rps(),
            allowed_domains: vec![],
        }
    }
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Minimum spacing between consecutive requests, if throttling is on.
    pub fn min_interval(&self) -> Option<Duration> {
        if self.requests_per_second > 0.0 {
            Some(Duration::from_secs_f64(1.0 / self.requests_per_second))
        } else {
            None
        }
    }
}

// ── Storage ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub counts_path: PathBuf,
    pub words_path: PathBuf,
}

// ── Modes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountsConfig {
    /// Persist the partially filled matrix after every completed row.
    #[serde(default)]
    pub checkpoint_rows: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordsConfig {
    /// Page through results with the service's history cursor.
    #[serde(default)]
    pub use_history: bool,
    /// Maximum ids returned by a direct (non-history) search.
    #[serde(default)]
    pub retmax: Option<u32>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Article identifier type harvested alongside the numeric id.
    #[serde(default = "default_id_type")]
    pub id_type: String,
}

fn default_page_size() -> u32 { 100 }
fn default_id_type()   -> String { "doi".to_string() }

impl Default for WordsConfig {
    fn default() -> Self {
        Self {
            use_history: false,
            retmax: None,
            page_size: default_page_size(),
            id_type: default_id_type(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermsConfig {
    pub a: Option<PathBuf>,
    pub a_exclusions: Option<PathBuf>,
    pub b: Option<PathBuf>,
    pub b_exclusions: Option<PathBuf>,
}

impl ScrapeConfig {
    /// Load from a `.toml`, `.yaml` or `.yml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LitscanError::Configuration(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            other => {
                return Err(LitscanError::Configuration(format!(
                    "Unsupported config format: {:?}",
                    other
                )))
            }
        };

        config.validate()?;
        debug!(path = %path.display(), db = %config.eutils.db, "Loaded scrape config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scraper cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.eutils.db.trim().is_empty() {
            return Err(LitscanError::Configuration("eutils.db must not be empty".into()));
        }
        if self.words.page_size == 0 {
            return Err(LitscanError::Configuration("words.page_size must be positive".into()));
        }
        if self.requests.timeout_secs == 0 {
            return Err(LitscanError::Configuration("requests.timeout_secs must be positive".into()));
        }
        if !self.requests.requests_per_second.is_finite() || self.requests.requests_per_second < 0.0 {
            return Err(LitscanError::Configuration(
                "requests.requests_per_second must be zero or positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[storage]
counts_path = "/tmp/litscan/counts"
words_path = "/tmp/litscan/words"
"#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = ScrapeConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.eutils.db, "pubmed");
        assert_eq!(config.eutils.field.as_deref(), Some("TIAB"));
        assert_eq!(config.words.page_size, 100);
        assert_eq!(config.words.id_type, "doi");
        assert!(!config.words.use_history);
        assert!(!config.counts.checkpoint_rows);
    }

    #[test]
    fn test_storage_is_required() {
        let err = ScrapeConfig::from_toml_str("[eutils]\ndb = \"pubmed\"\n").unwrap_err();
        assert!(matches!(err, LitscanError::Toml(_)));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let content = format!("{MINIMAL}\n[words]\npage_size = 0\n");
        let err = ScrapeConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(err, LitscanError::Configuration(_)));
    }

    #[test]
    fn test_min_interval() {
        let mut requests = RequestConfig::default();
        assert_eq!(requests.min_interval(), Some(Duration::from_secs_f64(1.0 / 3.0)));
        requests.requests_per_second = 0.0;
        assert_eq!(requests.min_interval(), None);
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "storage:\n  counts_path: /data/counts\n  words_path: /data/words\nwords:\n  use_history: true\n  page_size: 50\n"
        )
        .unwrap();

        let config = ScrapeConfig::from_path(file.path()).unwrap();
        assert!(config.words.use_history);
        assert_eq!(config.words.page_size, 50);
        assert_eq!(config.storage.words_path, PathBuf::from("/data/words"));
    }

    #[test]
    fn test_missing_file() {
        let err = ScrapeConfig::from_path("/nonexistent/litscan.toml").unwrap_err();
        assert!(matches!(err, LitscanError::Configuration(_)));
    }
}
