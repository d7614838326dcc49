//! Shared fixtures: a scripted E-utilities transport and an in-memory store.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use litscan_common::{LitscanError, Result, ScrapeConfig};
use litscan_scrape::articles::TermGroupArticleSet;
use litscan_scrape::counts::CountsSnapshot;
use litscan_scrape::requester::Transport;
use litscan_scrape::scraper::Scraper;
use litscan_scrape::store::Store;

pub const BASE_URL: &str = "http://localhost/entrez/eutils/";

pub const EINFO: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<eInfoResult><DbInfo><DbName>pubmed</DbName><MenuName>PubMed</MenuName>
<Description>PubMed bibliographic record</Description><DbBuild>Build-test</DbBuild>
<Count>1000</Count><LastUpdate>2024/01/01 00:00</LastUpdate></DbInfo></eInfoResult>"#;

/// One request as the mock saw it: endpoint file name plus decoded query.
#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: String,
    pub params: HashMap<String, String>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Answers einfo/esearch/efetch from a table of term counts.
///
/// Search terms map to counts (unknown terms count zero). Direct searches
/// return ids `1..=count`; history searches return the term itself as the
/// WebEnv token so page fetches can be traced back to it.
#[derive(Default)]
pub struct MockTransport {
    counts: HashMap<String, u64>,
    failing: HashSet<String>,
    no_cursor: HashSet<String>,
    without_keywords: bool,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, term: &str, n: u64) -> Self {
        self.counts.insert(term.to_string(), n);
        self
    }

    /// Searches for `term` (or fetches paging through it) fail transiently.
    pub fn failing(mut self, term: &str) -> Self {
        self.failing.insert(term.to_string());
        self
    }

    /// History searches for `term` omit the WebEnv token.
    pub fn without_cursor(mut self, term: &str) -> Self {
        self.no_cursor.insert(term.to_string());
        self
    }

    pub fn without_keywords(mut self) -> Self {
        self.without_keywords = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.endpoint == endpoint).collect()
    }

    /// Decoded `term` values of every search, in order.
    pub fn searched_terms(&self) -> Vec<String> {
        self.calls_to("esearch.fcgi")
            .into_iter()
            .filter_map(|c| c.params.get("term").cloned())
            .collect()
    }

    fn term_count(&self, term: &str) -> u64 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    fn search(&self, call: &Call) -> String {
        let term = call.param("term").unwrap_or_default();
        let count = self.term_count(term);

        if call.param("usehistory").is_some() {
            let web_env = if self.no_cursor.contains(term) {
                String::new()
            } else {
                format!("<WebEnv>{}</WebEnv>", escape(term))
            };
            format!("<eSearchResult><Count>{count}</Count><RetMax>20</RetMax><RetStart>0</RetStart><QueryKey>1</QueryKey>{web_env}<IdList></IdList></eSearchResult>")
        } else {
            let ids: String = (1..=count).map(|i| format!("<Id>{i}</Id>")).collect();
            format!("<eSearchResult><Count>{count}</Count><IdList>{ids}</IdList><TranslationSet/></eSearchResult>")
        }
    }

    fn fetch(&self, call: &Call) -> String {
        let ids: Vec<u64> = match (call.param("id"), call.param("WebEnv")) {
            (Some(ids), _) => ids.split(',').filter_map(|i| i.parse().ok()).collect(),
            (None, Some(term)) => {
                let start: u64 = call.param("retstart").and_then(|v| v.parse().ok()).unwrap_or(0);
                let max: u64 = call.param("retmax").and_then(|v| v.parse().ok()).unwrap_or(20);
                let end = (start + max).min(self.term_count(term));
                (start + 1..=end).collect()
            }
            (None, None) => Vec::new(),
        };
        let articles: String = ids.iter().map(|id| article_xml(*id, !self.without_keywords)).collect();
        format!("<?xml version=\"1.0\" ?>\n<PubmedArticleSet>{articles}</PubmedArticleSet>")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| LitscanError::Configuration(e.to_string()))?;
        let endpoint = parsed.path_segments().and_then(|s| s.last()).unwrap_or_default().to_string();
        let params: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
        let call = Call { endpoint, params };
        self.calls.lock().unwrap().push(call.clone());

        let key = call.param("term").or_else(|| call.param("WebEnv")).unwrap_or_default();
        if self.failing.contains(key) {
            return Err(LitscanError::TransientFetch {
                target: url.to_string(),
                reason: "operation timed out".to_string(),
            });
        }

        match call.endpoint.as_str() {
            "einfo.fcgi" => Ok(EINFO.to_string()),
            "esearch.fcgi" => Ok(self.search(&call)),
            "efetch.fcgi" => Ok(self.fetch(&call)),
            other => Err(LitscanError::MalformedResponse {
                target: url.to_string(),
                reason: format!("unexpected endpoint {other}"),
            }),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

pub fn article_xml(id: u64, with_keywords: bool) -> String {
    let keywords = if with_keywords {
        "<KeywordList><Keyword>N400</Keyword><Keyword>Semantics</Keyword></KeywordList>"
    } else {
        ""
    };
    format!(
        r#"<PubmedArticle><MedlineCitation><PMID Version="1">{id}</PMID><Article>
<Journal><JournalIssue><PubDate><Year>2020</Year><Month>Jan</Month></PubDate></JournalIssue>
<Title>Journal of Tests</Title><ISOAbbreviation>J Tests</ISOAbbreviation></Journal>
<ArticleTitle>Article {id}</ArticleTitle>
<Abstract><AbstractText>Semantic processing of words.</AbstractText></Abstract>
<AuthorList><Author><LastName>Kutas</LastName><ForeName>Marta</ForeName><Initials>M</Initials></Author></AuthorList>
</Article>{keywords}</MedlineCitation>
<PubmedData><ArticleIdList><ArticleId IdType="pubmed">{id}</ArticleId><ArticleId IdType="doi">10.1000/{id}</ArticleId></ArticleIdList></PubmedData>
</PubmedArticle>"#
    )
}

/// Keeps everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    counts: Mutex<HashMap<String, CountsSnapshot>>,
    articles: Mutex<HashMap<String, TermGroupArticleSet>>,
}

impl MemoryStore {
    pub fn article_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.articles.lock().unwrap().keys().cloned().collect();
        labels.sort();
        labels
    }

    pub fn counts_saves(&self) -> usize {
        self.counts.lock().unwrap().len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_counts(&self, name: &str, counts: &CountsSnapshot) -> Result<()> {
        self.counts.lock().unwrap().insert(name.to_string(), counts.clone());
        Ok(())
    }

    async fn save_articles(&self, label: &str, set: &TermGroupArticleSet) -> Result<()> {
        self.articles.lock().unwrap().insert(label.to_string(), set.clone());
        Ok(())
    }

    async fn load_counts(&self, name: &str) -> Result<CountsSnapshot> {
        self.counts
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| LitscanError::NotFound(name.to_string()))
    }

    async fn load_articles(&self, label: &str) -> Result<TermGroupArticleSet> {
        self.articles
            .lock()
            .unwrap()
            .get(label)
            .cloned()
            .ok_or_else(|| LitscanError::NotFound(label.to_string()))
    }
}

pub fn config() -> ScrapeConfig {
    let mut config = ScrapeConfig::from_toml_str(
        r#"
[storage]
counts_path = "unused/counts"
words_path = "unused/words"
"#,
    )
    .unwrap();
    config.eutils.base_url = BASE_URL.to_string();
    config.requests.requests_per_second = 0.0;
    config
}

pub fn scraper(config: &ScrapeConfig, transport: MockTransport) -> (Scraper<MockTransport>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let scraper = Scraper::new(config, transport, store.clone());
    (scraper, store)
}
