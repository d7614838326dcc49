//! Retrieval mode: per-term-group article harvesting.
//!
//! Each group runs through
//! `Idle -> Searching -> (Paging | Extracting) -> Finalized`.
//! With the history cursor enabled the search yields a count plus session
//! and query tokens, and pages are fetched until the offset passes the
//! count. Without it the search yields an id list fetched in one request.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use litscan_common::config::WordsConfig;
use litscan_common::{LitscanError, Result};

use super::{get_db_info, missing, ScrapeMeta, Scraper};
use crate::articles::TermGroupArticleSet;
use crate::document::{extract_all, extract_first, extract_raw, Document};
use crate::extract::extract_articles;
use crate::query::SearchQuery;
use crate::requester::{Session, Transport};
use crate::store::Store;
use crate::terms::TermGroup;
use crate::urls::{Target, UrlOption, Urls};
use crate::words::{Words, WordsResult};

/// Continuation state for one term group's history-cursor result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    web_env: String,
    query_key: String,
    count: u64,
    offset: u64,
    page_size: u64,
}

impl Cursor {
    pub fn new(web_env: impl Into<String>, query_key: impl Into<String>, count: u64, page_size: u64) -> Self {
        Self {
            web_env: web_env.into(),
            query_key: query_key.into(),
            count,
            offset: 0,
            page_size: page_size.max(1),
        }
    }

    /// Read count and tokens from a history-mode search response.
    ///
    /// Returns `None` for a zero-hit search; the tokens are only required
    /// when there is something to page through.
    pub fn from_search(doc: &Document, target: &Target, page_size: u64) -> Result<Option<Self>> {
        let root = doc.root();
        let count = search_hits(doc).ok_or_else(|| missing(target, "count"))?;
        if count == 0 {
            return Ok(None);
        }
        let web_env = extract_first(root, "webenv")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(target, "webenv"))?;
        let query_key = extract_first(root, "querykey")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(target, "querykey"))?;
        Ok(Some(Self::new(web_env, query_key, count, page_size)))
    }

    pub fn web_env(&self) -> &str { &self.web_env }
    pub fn query_key(&self) -> &str { &self.query_key }
    pub fn count(&self) -> u64 { self.count }
    pub fn offset(&self) -> u64 { self.offset }
    pub fn page_size(&self) -> u64 { self.page_size }

    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.count
    }

    pub fn advance(&mut self) {
        self.offset += self.page_size;
    }

    pub fn page_target(&self, urls: &Urls) -> Result<Target> {
        urls.fetch_page_target(&self.web_env, &self.query_key, self.offset, self.page_size)
    }
}

/// Where one term group's scrape currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Searching,
    Paging(Cursor),
    Extracting(Vec<u64>),
    Finalized,
}

fn search_hits(doc: &Document) -> Option<u64> {
    extract_first(doc.root(), "count").and_then(|c| c.trim().parse().ok())
}

/// Read the direct id list from a search response.
fn id_list(doc: &Document, target: &Target) -> Result<Vec<u64>> {
    let Some(list) = extract_raw(doc.root(), "idlist") else {
        return match search_hits(doc) {
            Some(0) => Ok(Vec::new()),
            _ => Err(missing(target, "idlist")),
        };
    };
    extract_all(list, "id")
        .into_iter()
        .map(|node| {
            let raw = node.text();
            raw.trim().parse().map_err(|_| LitscanError::MalformedResponse {
                target: target.url.clone(),
                reason: format!("non-numeric id '{}'", raw.trim()),
            })
        })
        .collect()
}

/// Extract a fetched batch into the accumulator.
fn add_batch(acc: &mut TermGroupArticleSet, doc: &Document, id_type: &str) -> usize {
    let records = extract_articles(doc.root(), id_type);
    let n = records.len();
    for record in records {
        acc.add_record(record);
    }
    n
}

impl<T: Transport> Scraper<T> {
    fn retrieval_urls(&self) -> Result<Urls> {
        let config = &self.words_config;
        let mut urls = self.base_urls();
        let mut search = vec![UrlOption::Db, UrlOption::Retmode];

        if config.use_history {
            urls.set(UrlOption::Usehistory, "y");
            search.push(UrlOption::Usehistory);
        } else if let Some(retmax) = config.retmax {
            urls.set(UrlOption::Retmax, retmax.to_string());
            search.push(UrlOption::Retmax);
        }

        urls.build_info(&[UrlOption::Db])?;
        urls.build_search(&self.with_field(&search))?;
        urls.build_fetch(&[UrlOption::Db, UrlOption::Retmode])?;
        Ok(urls)
    }

    /// Harvest articles for every term group in `words`, in order.
    ///
    /// Each finished group is flushed to storage before the next starts. A
    /// failing group aborts the run; groups already finished stay stored
    /// and listed in `words`.
    #[instrument(skip_all, fields(n_groups = words.terms().len(), history = self.words_config.use_history))]
    pub async fn collect_words(&mut self, words: &mut Words) -> Result<()> {
        if words.terms().is_empty() {
            return Err(LitscanError::Configuration("No term groups to scrape".into()));
        }

        let urls = self.retrieval_urls()?;
        words.begin_run();
        let groups: Vec<TermGroup> = words.terms().groups().to_vec();
        let mut acc = TermGroupArticleSet::new(String::new(), Vec::new());

        let mut session = self.requester.open();
        let db_info = get_db_info(&mut session, &urls).await?;

        for group in &groups {
            info!(label = %group.label(), "Scraping term group");
            match scrape_group(&mut session, &urls, group, &mut acc, &self.words_config, self.store.as_ref()).await {
                Ok(n) => {
                    info!(label = %group.label(), articles = n, "Finished term group");
                    words.push_result(WordsResult::from_set(&acc, n));
                }
                Err(e) => {
                    warn!(label = %group.label(), error = %e, "Term group failed, aborting run");
                    acc.clear();
                    return Err(e);
                }
            }
        }

        let requests = session.finish();
        info!(n_requests = requests.n_requests, articles = words.total_articles(), "Retrieval complete");
        words.set_meta(ScrapeMeta { date: Utc::now(), db_info, requests });
        Ok(())
    }
}

/// Run one term group through the phase machine and flush its articles.
/// Returns the number of articles stored.
async fn scrape_group<T: Transport>(
    session: &mut Session<'_, T>,
    urls: &Urls,
    group: &TermGroup,
    acc: &mut TermGroupArticleSet,
    config: &WordsConfig,
    store: &dyn Store,
) -> Result<usize> {
    let label = group.label();
    acc.reset_for(group);
    acc.record_event("Start Scrape");

    let mut phase = Phase::Idle;
    loop {
        phase = match phase {
            Phase::Idle => Phase::Searching,

            Phase::Searching => {
                let target = urls.search_target(&SearchQuery::single(group))?;
                let doc = session.fetch(&target).await.map_err(|e| e.for_term(label, "search"))?;

                if config.use_history {
                    match Cursor::from_search(&doc, &target, u64::from(config.page_size))
                        .map_err(|e| e.for_term(label, "search"))?
                    {
                        Some(cursor) => {
                            debug!(label, count = cursor.count(), "History cursor opened");
                            Phase::Paging(cursor)
                        }
                        None => {
                            debug!(label, "No hits");
                            Phase::Finalized
                        }
                    }
                } else {
                    let ids = id_list(&doc, &target).map_err(|e| e.for_term(label, "search"))?;
                    debug!(label, n_ids = ids.len(), "Id list received");
                    if ids.is_empty() { Phase::Finalized } else { Phase::Extracting(ids) }
                }
            }

            Phase::Paging(mut cursor) => {
                let target = cursor.page_target(urls)?;
                let doc = session.fetch(&target).await.map_err(|e| e.for_term(label, "fetch page"))?;
                let n = add_batch(acc, &doc, &config.id_type);
                debug!(label, offset = cursor.offset(), extracted = n, "Fetched page");
                cursor.advance();
                if cursor.is_exhausted() { Phase::Finalized } else { Phase::Paging(cursor) }
            }

            Phase::Extracting(ids) => {
                let target = urls.fetch_ids_target(&ids)?;
                let doc = session.fetch(&target).await.map_err(|e| e.for_term(label, "fetch"))?;
                let n = add_batch(acc, &doc, &config.id_type);
                debug!(label, requested = ids.len(), extracted = n, "Fetched id batch");
                Phase::Finalized
            }

            Phase::Finalized => break,
        };
    }

    acc.check_consistency().map_err(|e| e.for_term(label, "finalize"))?;
    acc.record_event("End Scrape");
    let n = acc.article_count();
    acc.flush_and_clear(store).await.map_err(|e| e.for_term(label, "flush"))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFormat;
    use crate::urls::Endpoint;

    fn target() -> Target {
        Target { endpoint: Endpoint::Search, url: "http://localhost/esearch.fcgi".to_string() }
    }

    fn search_doc(body: &str) -> Document {
        Document::parse(body, DocumentFormat::Markup).unwrap()
    }

    #[test]
    fn test_cursor_offsets() {
        let mut cursor = Cursor::new("MCID", "1", 250, 100);
        let mut offsets = vec![];
        while !cursor.is_exhausted() {
            offsets.push(cursor.offset());
            cursor.advance();
        }
        assert_eq!(offsets, vec![0, 100, 200]);
    }

    #[test]
    fn test_cursor_from_search() {
        let doc = search_doc("<eSearchResult><Count>3</Count><QueryKey>1</QueryKey><WebEnv>MCID_9</WebEnv></eSearchResult>");
        let cursor = Cursor::from_search(&doc, &target(), 100).unwrap();
        assert_eq!(cursor, Some(Cursor::new("MCID_9", "1", 3, 100)));
    }

    #[test]
    fn test_zero_hits_need_no_tokens() {
        let doc = search_doc("<eSearchResult><Count>0</Count><ErrorList><PhraseNotFound>zzz</PhraseNotFound></ErrorList></eSearchResult>");
        assert_eq!(Cursor::from_search(&doc, &target(), 100).unwrap(), None);
        assert!(id_list(&doc, &target()).unwrap().is_empty());
    }

    #[test]
    fn test_cursor_missing_token_is_malformed() {
        let doc = search_doc("<eSearchResult><Count>3</Count><QueryKey>1</QueryKey></eSearchResult>");
        let err = Cursor::from_search(&doc, &target(), 100).unwrap_err();
        assert!(matches!(err, LitscanError::MalformedResponse { .. }));
    }

    #[test]
    fn test_id_list() {
        let doc = search_doc("<eSearchResult><Count>2</Count><IdList><Id>11</Id><Id>22</Id></IdList></eSearchResult>");
        assert_eq!(id_list(&doc, &target()).unwrap(), vec![11, 22]);

        let empty = search_doc("<eSearchResult><Count>0</Count><IdList/></eSearchResult>");
        assert!(id_list(&empty, &target()).unwrap().is_empty());

        let bad = search_doc("<eSearchResult><IdList><Id>x</Id></IdList></eSearchResult>");
        assert!(id_list(&bad, &target()).is_err());
    }
}
