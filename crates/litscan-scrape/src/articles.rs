//! Per-term article records and the accumulator that collects them.
//!
//! A [`TermGroupArticleSet`] keeps one parallel list per article field. Every
//! list must have exactly `article_count` entries whenever the set is
//! checked, flushed or read back as records.

use chrono::{DateTime, Utc};
use litscan_common::{LitscanError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::Store;
use crate::terms::TermGroup;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub initials: Option<String>,
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubDate {
    pub year: Option<i32>,
    /// Month as written by the source ("Jan", "01", ...).
    pub month: Option<String>,
}

/// One harvested article. Everything but `id` may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: u64,
    pub title: Option<String>,
    pub authors: Option<Vec<Author>>,
    pub journal: Journal,
    pub words: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub pub_date: PubDate,
    pub doi: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub label: String,
    pub at: DateTime<Utc>,
}

/// Articles collected for one term group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermGroupArticleSet {
    label: String,
    synonyms: Vec<String>,
    ids: Vec<u64>,
    titles: Vec<Option<String>>,
    authors: Vec<Option<Vec<Author>>>,
    journals: Vec<Journal>,
    words: Vec<Option<Vec<String>>>,
    keywords: Vec<Option<Vec<String>>>,
    years: Vec<Option<i32>>,
    months: Vec<Option<String>>,
    dois: Vec<Option<String>>,
    article_count: usize,
    history: Vec<HistoryEvent>,
}

impl TermGroupArticleSet {
    pub fn new(label: impl Into<String>, synonyms: Vec<String>) -> Self {
        Self {
            label: label.into(),
            synonyms,
            ids: Vec::new(),
            titles: Vec::new(),
            authors: Vec::new(),
            journals: Vec::new(),
            words: Vec::new(),
            keywords: Vec::new(),
            years: Vec::new(),
            months: Vec::new(),
            dois: Vec::new(),
            article_count: 0,
            history: Vec::new(),
        }
    }

    pub fn for_group(group: &TermGroup) -> Self {
        Self::new(group.label(), group.synonyms().to_vec())
    }

    /// Rebind an emptied accumulator to the next term group.
    pub fn reset_for(&mut self, group: &TermGroup) {
        *self = Self::for_group(group);
    }

    pub fn label(&self) -> &str { &self.label }
    pub fn synonyms(&self) -> &[String] { &self.synonyms }
    pub fn article_count(&self) -> usize { self.article_count }
    pub fn history(&self) -> &[HistoryEvent] { &self.history }
    pub fn ids(&self) -> &[u64] { &self.ids }
    pub fn titles(&self) -> &[Option<String>] { &self.titles }
    pub fn authors(&self) -> &[Option<Vec<Author>>] { &self.authors }
    pub fn journals(&self) -> &[Journal] { &self.journals }
    pub fn words(&self) -> &[Option<Vec<String>>] { &self.words }
    pub fn keywords(&self) -> &[Option<Vec<String>>] { &self.keywords }
    pub fn years(&self) -> &[Option<i32>] { &self.years }
    pub fn months(&self) -> &[Option<String>] { &self.months }
    pub fn dois(&self) -> &[Option<String>] { &self.dois }

    pub fn add_id(&mut self, id: u64) {
        self.ids.push(id);
    }

    pub fn add_title(&mut self, title: Option<String>) {
        self.titles.push(title);
    }

    pub fn add_authors(&mut self, authors: Option<Vec<Author>>) {
        self.authors.push(authors);
    }

    pub fn add_journal(&mut self, name: Option<String>, abbreviation: Option<String>) {
        self.journals.push(Journal { name, abbreviation });
    }

    pub fn add_words(&mut self, words: Option<Vec<String>>) {
        self.words.push(words);
    }

    pub fn add_keywords(&mut self, keywords: Option<Vec<String>>) {
        self.keywords.push(keywords);
    }

    pub fn add_pub_date(&mut self, date: PubDate) {
        self.years.push(date.year);
        self.months.push(date.month);
    }

    pub fn add_doi(&mut self, doi: Option<String>) {
        self.dois.push(doi);
    }

    pub fn increment_article_count(&mut self) {
        self.article_count += 1;
    }

    /// Append every field of one article and count it.
    pub fn add_record(&mut self, record: ArticleRecord) {
        self.add_id(record.id);
        self.add_title(record.title);
        self.add_authors(record.authors);
        self.add_journal(record.journal.name, record.journal.abbreviation);
        self.add_words(record.words);
        self.add_keywords(record.keywords);
        self.add_pub_date(record.pub_date);
        self.add_doi(record.doi);
        self.increment_article_count();
    }

    fn field_lengths(&self) -> [(&'static str, usize); 9] {
        [
            ("ids", self.ids.len()),
            ("titles", self.titles.len()),
            ("authors", self.authors.len()),
            ("journals", self.journals.len()),
            ("words", self.words.len()),
            ("keywords", self.keywords.len()),
            ("years", self.years.len()),
            ("months", self.months.len()),
            ("dois", self.dois.len()),
        ]
    }

    /// Every parallel list must hold exactly `article_count` entries.
    pub fn check_consistency(&self) -> Result<()> {
        let mismatched: Vec<String> = self
            .field_lengths()
            .iter()
            .filter(|(_, len)| *len != self.article_count)
            .map(|(name, len)| format!("{name}={len}"))
            .collect();

        if mismatched.is_empty() {
            Ok(())
        } else {
            Err(LitscanError::InconsistentData(format!(
                "Term group '{}' has {} articles but {}",
                self.label,
                self.article_count,
                mismatched.join(", ")
            )))
        }
    }

    pub fn record_event(&mut self, label: impl Into<String>) {
        self.history.push(HistoryEvent { label: label.into(), at: Utc::now() });
    }

    /// Reset all article data, keeping label, synonyms and history.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.titles.clear();
        self.authors.clear();
        self.journals.clear();
        self.words.clear();
        self.keywords.clear();
        self.years.clear();
        self.months.clear();
        self.dois.clear();
        self.article_count = 0;
    }

    /// Hand the current contents to storage, then clear.
    pub async fn flush_and_clear(&mut self, store: &dyn Store) -> Result<()> {
        self.check_consistency()?;
        store.save_articles(&self.label, self).await?;
        debug!(label = %self.label, articles = self.article_count, "Flushed term group articles");
        self.clear();
        Ok(())
    }

    /// Read the parallel lists back as per-article records.
    pub fn records(&self) -> Result<Vec<ArticleRecord>> {
        self.check_consistency()?;
        Ok((0..self.article_count)
            .map(|i| ArticleRecord {
                id: self.ids[i],
                title: self.titles[i].clone(),
                authors: self.authors[i].clone(),
                journal: self.journals[i].clone(),
                words: self.words[i].clone(),
                keywords: self.keywords[i].clone(),
                pub_date: PubDate { year: self.years[i], month: self.months[i].clone() },
                doi: self.dois[i].clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64) -> ArticleRecord {
        ArticleRecord {
            id,
            title: Some("title".to_string()),
            authors: Some(vec![Author {
                last_name: Some("A".to_string()),
                first_name: Some("B".to_string()),
                initials: Some("C".to_string()),
                affiliation: Some("D".to_string()),
            }]),
            journal: Journal { name: Some("science".to_string()), abbreviation: Some("sc".to_string()) },
            words: Some(vec!["new".to_string(), "words".to_string()]),
            keywords: Some(vec!["lots".to_string(), "of".to_string(), "erps".to_string()]),
            pub_date: PubDate { year: Some(2112), month: Some("Jan".to_string()) },
            doi: Some("doi_str".to_string()),
        }
    }

    fn filled(n: u64) -> TermGroupArticleSet {
        let mut set = TermGroupArticleSet::new("test", vec!["test".to_string()]);
        for i in 0..n {
            set.add_record(record(i));
        }
        set
    }

    #[test]
    fn test_add_record_keeps_lists_aligned() {
        let set = filled(3);
        assert_eq!(set.article_count(), 3);
        set.check_consistency().unwrap();
        assert_eq!(set.years(), &[Some(2112); 3]);
        assert_eq!(set.months()[0].as_deref(), Some("Jan"));
    }

    #[test]
    fn test_stray_append_is_inconsistent() {
        let mut set = filled(2);
        set.add_title(Some("extra".to_string()));
        let err = set.check_consistency().unwrap_err();
        assert!(matches!(err, LitscanError::InconsistentData(_)));
        assert!(err.to_string().contains("titles=3"));
    }

    #[test]
    fn test_count_without_fields_is_inconsistent() {
        let mut set = filled(1);
        set.increment_article_count();
        assert!(set.check_consistency().is_err());
    }

    #[test]
    fn test_clear_keeps_identity() {
        let mut set = filled(2);
        set.record_event("Start Scrape");
        set.clear();
        set.check_consistency().unwrap();
        assert_eq!(set.article_count(), 0);
        assert_eq!(set.label(), "test");
        assert_eq!(set.synonyms(), &["test".to_string()]);
        assert_eq!(set.history().len(), 1);
    }

    #[test]
    fn test_records_roundtrip() {
        let set = filled(2);
        let records = set.records().unwrap();
        assert_eq!(records, vec![record(0), record(1)]);

        let mut again = TermGroupArticleSet::new("test", vec!["test".to_string()]);
        for r in records {
            again.add_record(r);
        }
        assert_eq!(again, set);
    }

    #[test]
    fn test_reset_for_rebinds_group() {
        let mut set = filled(1);
        set.record_event("Start Scrape");
        let group = TermGroup::new("P600", vec!["P600".to_string(), "SPS".to_string()]).unwrap();
        set.reset_for(&group);
        assert_eq!(set.label(), "P600");
        assert_eq!(set.article_count(), 0);
        assert!(set.history().is_empty());
    }
}
