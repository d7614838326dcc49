//! Scrape orchestrator.
//!
//! One [`Scraper`] drives both modes:
//!   - counting (`collect_counts`): single-term and pairwise search counts
//!     into a co-occurrence matrix
//!   - retrieval (`collect_words`): per-term-group article harvesting,
//!     flushed to storage one group at a time
//!
//! Every run opens one request session, records database info first, and
//! issues all remote calls strictly in order.

mod counting;
mod retrieval;

pub use retrieval::{Cursor, Phase};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use litscan_common::config::{CountsConfig, EutilsConfig, WordsConfig};
use litscan_common::{LitscanError, Result, ScrapeConfig};

use crate::document::{extract_first, extract_raw, Document};
use crate::query::SearchQuery;
use crate::requester::{RequestLog, Requester, Session, Transport};
use crate::store::Store;
use crate::urls::{Target, UrlOption, Urls};

/// Database description returned by the info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbInfo {
    pub dbname: Option<String>,
    pub menuname: Option<String>,
    pub description: Option<String>,
    pub dbbuild: Option<String>,
    pub count: Option<String>,
    pub lastupdate: Option<String>,
}

impl DbInfo {
    pub fn from_document(doc: &Document) -> Self {
        let node = extract_raw(doc.root(), "dbinfo").unwrap_or(doc.root());
        Self {
            dbname: extract_first(node, "dbname"),
            menuname: extract_first(node, "menuname"),
            description: extract_first(node, "description"),
            dbbuild: extract_first(node, "dbbuild"),
            count: extract_first(node, "count"),
            lastupdate: extract_first(node, "lastupdate"),
        }
    }
}

/// Provenance attached to every finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeMeta {
    pub date: DateTime<Utc>,
    pub db_info: DbInfo,
    pub requests: RequestLog,
}

pub struct Scraper<T: Transport> {
    requester: Requester<T>,
    store: Arc<dyn Store>,
    eutils: EutilsConfig,
    counts_config: CountsConfig,
    words_config: WordsConfig,
}

impl<T: Transport> Scraper<T> {
    pub fn new(config: &ScrapeConfig, transport: T, store: Arc<dyn Store>) -> Self {
        Self {
            requester: Requester::from_config(transport, &config.requests),
            store,
            eutils: config.eutils.clone(),
            counts_config: config.counts.clone(),
            words_config: config.words.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn request_log(&self) -> &RequestLog {
        self.requester.log()
    }

    pub fn transport(&self) -> &T {
        self.requester.transport()
    }

    /// Builder preloaded with `db`, `retmode` and, when configured, `field`.
    fn base_urls(&self) -> Urls {
        let mut urls = Urls::new(&self.eutils.base_url)
            .with(UrlOption::Db, &self.eutils.db)
            .with(UrlOption::Retmode, &self.eutils.retmode);
        if let Some(field) = &self.eutils.field {
            urls.set(UrlOption::Field, field);
        }
        urls
    }

    /// `base` plus `field` when it is configured.
    fn with_field(&self, base: &[UrlOption]) -> Vec<UrlOption> {
        let mut options = base.to_vec();
        if self.eutils.field.is_some() {
            options.push(UrlOption::Field);
        }
        options
    }

    /// Query the info endpoint in a session of its own.
    pub async fn db_info(&mut self) -> Result<DbInfo> {
        let mut urls = self.base_urls();
        urls.build_info(&[UrlOption::Db])?;
        let mut session = self.requester.open();
        get_db_info(&mut session, &urls).await
    }
}

pub(crate) async fn get_db_info<T: Transport>(session: &mut Session<'_, T>, urls: &Urls) -> Result<DbInfo> {
    let doc = session.fetch(&urls.info_target()?).await?;
    let info = DbInfo::from_document(&doc);
    debug!(dbname = ?info.dbname, dbbuild = ?info.dbbuild, "Database info");
    Ok(info)
}

fn missing(target: &Target, what: &str) -> LitscanError {
    LitscanError::MalformedResponse {
        target: target.url.clone(),
        reason: format!("search response has no usable <{what}>"),
    }
}

/// Issue a search and read the first `<count>` of the response.
pub(crate) async fn search_count<T: Transport>(
    session: &mut Session<'_, T>,
    urls: &Urls,
    query: &SearchQuery,
) -> Result<u64> {
    let target = urls.search_target(query)?;
    let doc = session.fetch(&target).await?;
    extract_first(doc.root(), "count")
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| missing(&target, "count"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFormat;

    const EINFO: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<eInfoResult><DbInfo><DbName>pubmed</DbName><MenuName>PubMed</MenuName>
<Description>PubMed bibliographic record</Description><DbBuild>Build-2024.01.01</DbBuild>
<Count>36000000</Count><LastUpdate>2024/01/01 04:00</LastUpdate>
<FieldList><Field><Name>ALL</Name><Description>All terms from all searchable fields</Description></Field></FieldList>
</DbInfo></eInfoResult>"#;

    #[test]
    fn test_db_info_from_document() {
        let doc = Document::parse(EINFO, DocumentFormat::Markup).unwrap();
        let info = DbInfo::from_document(&doc);
        assert_eq!(info.dbname.as_deref(), Some("pubmed"));
        assert_eq!(info.menuname.as_deref(), Some("PubMed"));
        assert_eq!(info.description.as_deref(), Some("PubMed bibliographic record"));
        assert_eq!(info.dbbuild.as_deref(), Some("Build-2024.01.01"));
        assert_eq!(info.count.as_deref(), Some("36000000"));
        assert_eq!(info.lastupdate.as_deref(), Some("2024/01/01 04:00"));
    }

    #[test]
    fn test_db_info_missing_fields() {
        let doc = Document::parse("<eInfoResult><ERROR>bad</ERROR></eInfoResult>", DocumentFormat::Markup).unwrap();
        assert_eq!(DbInfo::from_document(&doc), DbInfo::default());
    }
}
