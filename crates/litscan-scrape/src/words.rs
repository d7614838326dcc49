//! Retrieval-mode results.

use serde::{Deserialize, Serialize};

use litscan_common::Result;

use crate::articles::{HistoryEvent, TermGroupArticleSet};
use crate::scraper::ScrapeMeta;
use crate::terms::{TermGroup, TermGroupSet, TermInput};

/// What remains in memory for one finished term group. The article data
/// itself has been handed to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordsResult {
    pub label: String,
    pub article_count: usize,
    pub history: Vec<HistoryEvent>,
}

impl WordsResult {
    pub(crate) fn from_set(set: &TermGroupArticleSet, article_count: usize) -> Self {
        Self {
            label: set.label().to_string(),
            article_count,
            history: set.history().to_vec(),
        }
    }
}

/// A term registry and the per-group outcome of a retrieval run.
#[derive(Debug, Clone, Default)]
pub struct Words {
    terms: TermGroupSet,
    results: Vec<WordsResult>,
    meta: Option<ScrapeMeta>,
}

impl Words {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_terms<I, T>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<TermInput>,
    {
        self.terms.set_groups(inputs)?;
        self.results.clear();
        Ok(())
    }

    pub fn set_term_groups(&mut self, groups: Vec<TermGroup>) -> Result<()> {
        self.terms.set_term_groups(groups)?;
        self.results.clear();
        Ok(())
    }

    pub fn set_exclusions<I, T>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<TermInput>,
    {
        self.terms.set_exclusions(inputs)
    }

    pub fn unset_terms(&mut self) {
        self.terms.unset_groups();
        self.results.clear();
    }

    pub fn unset_exclusions(&mut self) {
        self.terms.unset_exclusions();
    }

    pub fn terms(&self) -> &TermGroupSet {
        &self.terms
    }

    pub fn results(&self) -> &[WordsResult] {
        &self.results
    }

    pub fn get(&self, label: &str) -> Option<&WordsResult> {
        self.results.iter().find(|r| r.label == label)
    }

    pub fn meta(&self) -> Option<&ScrapeMeta> {
        self.meta.as_ref()
    }

    /// Total articles over all finished groups.
    pub fn total_articles(&self) -> usize {
        self.results.iter().map(|r| r.article_count).sum()
    }

    pub(crate) fn begin_run(&mut self) {
        self.results.clear();
        self.meta = None;
    }

    pub(crate) fn push_result(&mut self, result: WordsResult) {
        self.results.push(result);
    }

    pub(crate) fn set_meta(&mut self, meta: ScrapeMeta) {
        self.meta = Some(meta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_label() {
        let mut words = Words::new();
        words.set_terms(["N400", "P600"]).unwrap();
        let set = TermGroupArticleSet::new("N400", vec!["N400".to_string()]);
        words.push_result(WordsResult::from_set(&set, 12));

        assert_eq!(words.get("N400").map(|r| r.article_count), Some(12));
        assert!(words.get("P600").is_none());
        assert_eq!(words.total_articles(), 12);
    }

    #[test]
    fn test_resetting_terms_drops_results() {
        let mut words = Words::new();
        words.set_terms(["N400"]).unwrap();
        let set = TermGroupArticleSet::new("N400", vec!["N400".to_string()]);
        words.push_result(WordsResult::from_set(&set, 1));

        words.set_terms(["P300"]).unwrap();
        assert!(words.results().is_empty());
    }
}
