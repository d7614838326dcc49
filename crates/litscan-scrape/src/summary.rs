//! Aggregate views over a term group's harvested articles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::articles::{Author, TermGroupArticleSet};

/// Number of words and keywords kept in a summary.
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub label: String,
    pub article_count: usize,
    pub first_year: Option<i32>,
    pub top_journal: Option<(String, usize)>,
    pub top_author: Option<(String, usize)>,
    pub top_words: Vec<(String, usize)>,
    pub top_keywords: Vec<(String, usize)>,
}

impl ArticleSummary {
    pub fn from_set(set: &TermGroupArticleSet) -> Self {
        Self::with_top_n(set, DEFAULT_TOP_N)
    }

    pub fn with_top_n(set: &TermGroupArticleSet, top_n: usize) -> Self {
        let journals = frequencies(set.journals().iter().filter_map(|j| j.name.clone()));
        let authors = frequencies(
            set.authors()
                .iter()
                .flatten()
                .flatten()
                .filter_map(author_name),
        );
        let words = frequencies(set.words().iter().flatten().flatten().cloned());
        let keywords = frequencies(set.keywords().iter().flatten().flatten().cloned());

        Self {
            label: set.label().to_string(),
            article_count: set.article_count(),
            first_year: set.years().iter().flatten().min().copied(),
            top_journal: journals.into_iter().next(),
            top_author: authors.into_iter().next(),
            top_words: words.into_iter().take(top_n).collect(),
            top_keywords: keywords.into_iter().take(top_n).collect(),
        }
    }
}

/// "Last F" style display name; authors without a last name are skipped.
fn author_name(author: &Author) -> Option<String> {
    let last = author.last_name.as_deref()?;
    Some(match author.initials.as_deref() {
        Some(initials) => format!("{last} {initials}"),
        None => last.to_string(),
    })
}

/// Occurrence counts, most frequent first; ties broken alphabetically.
fn frequencies<I: IntoIterator<Item = String>>(items: I) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}
