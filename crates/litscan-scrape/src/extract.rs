//! Per-article field extraction from a fetched article set.
//!
//! Every field goes through [`safe`]: a failure on one field is logged and
//! recorded as missing, and never aborts the article or the page.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::articles::{ArticleRecord, Author, Journal, PubDate};
use crate::document::{extract_all, extract_first, extract_raw, Node};
use crate::text::clean_words;

lazy_static! {
    static ref YEAR_RE: Regex = Regex::new(r"\b(\d{4})\b").unwrap();
}

#[derive(Debug, Error)]
enum FieldError {
    #[error("tag <{0}> not present")]
    Missing(&'static str),

    #[error("tag <{tag}> has unparseable value '{value}'")]
    Unparseable { tag: &'static str, value: String },
}

/// Run one field extractor; on failure log and yield `None`.
fn safe<T>(field: &str, node: &Node, f: impl FnOnce(&Node) -> Result<T, FieldError>) -> Option<T> {
    match f(node) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(field, error = %e, "Field extraction failed");
            None
        }
    }
}

fn required(node: &Node, tag: &'static str) -> Result<String, FieldError> {
    extract_first(node, tag).ok_or(FieldError::Missing(tag))
}

fn optional(node: &Node, tag: &str) -> Option<String> {
    extract_first(node, tag).filter(|s| !s.is_empty())
}

fn title(article: &Node) -> Result<String, FieldError> {
    required(article, "ArticleTitle")
}

fn authors(article: &Node) -> Result<Vec<Author>, FieldError> {
    let list = extract_raw(article, "AuthorList").ok_or(FieldError::Missing("AuthorList"))?;
    Ok(extract_all(list, "Author")
        .into_iter()
        .map(|author| Author {
            last_name: optional(author, "LastName"),
            first_name: optional(author, "ForeName"),
            initials: optional(author, "Initials"),
            affiliation: optional(author, "Affiliation"),
        })
        .collect())
}

fn journal(article: &Node) -> Journal {
    Journal {
        name: optional(article, "Title"),
        abbreviation: optional(article, "ISOAbbreviation"),
    }
}

/// All abstract sections joined, cleaned into words.
fn words(article: &Node) -> Result<Vec<String>, FieldError> {
    let sections = extract_all(article, "AbstractText");
    if sections.is_empty() {
        return Err(FieldError::Missing("AbstractText"));
    }
    let text: Vec<String> = sections.iter().map(|s| s.text()).collect();
    Ok(clean_words(&text.join(" ")))
}

fn keywords(article: &Node) -> Result<Vec<String>, FieldError> {
    let tags = extract_all(article, "Keyword");
    if tags.is_empty() {
        return Err(FieldError::Missing("Keyword"));
    }
    Ok(tags
        .into_iter()
        .map(|k| k.text().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect())
}

fn year(pub_date: &Node) -> Result<i32, FieldError> {
    if let Some(raw) = extract_first(pub_date, "Year") {
        return raw
            .parse()
            .map_err(|_| FieldError::Unparseable { tag: "Year", value: raw });
    }
    // "1998 Dec-1999 Jan" style dates only carry the year inside free text.
    let raw = required(pub_date, "MedlineDate")?;
    let parsed = YEAR_RE.captures(&raw).and_then(|c| c[1].parse().ok());
    parsed.ok_or(FieldError::Unparseable { tag: "MedlineDate", value: raw })
}

fn pub_date(article: &Node) -> PubDate {
    match extract_raw(article, "PubDate") {
        Some(date) => PubDate {
            year: safe("year", date, year),
            month: optional(date, "Month"),
        },
        None => PubDate::default(),
    }
}

fn article_id(article: &Node, id_type: &str) -> Option<String> {
    extract_all(article, "ArticleId")
        .into_iter()
        .find(|n| n.attr("IdType") == Some(id_type))
        .map(|n| n.text().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn pubmed_id(article: &Node) -> Option<u64> {
    article_id(article, "pubmed")
        .or_else(|| extract_first(article, "PMID"))
        .and_then(|raw| raw.parse().ok())
}

/// Build a record from one `PubmedArticle` element. Articles with no
/// usable identifier are skipped.
pub fn extract_article(article: &Node, id_type: &str) -> Option<ArticleRecord> {
    let Some(id) = pubmed_id(article) else {
        warn!("Skipping article without a pubmed identifier");
        return None;
    };

    Some(ArticleRecord {
        id,
        title: safe("title", article, title),
        authors: safe("authors", article, authors),
        journal: journal(article),
        words: safe("words", article, words),
        keywords: safe("keywords", article, keywords),
        pub_date: pub_date(article),
        doi: article_id(article, id_type),
    })
}

/// Extract every `PubmedArticle` in a fetched page, in document order.
pub fn extract_articles(page: &Node, id_type: &str) -> Vec<ArticleRecord> {
    extract_all(page, "PubmedArticle")
        .into_iter()
        .filter_map(|article| extract_article(article, id_type))
        .collect()
}
