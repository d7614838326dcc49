//! Search-term composition.
//!
//! A term group becomes `("syn1"OR"syn2")NOT("excl1"OR"excl2")`; a pair of
//! groups joins two of those with `AND`. The grammar is otherwise opaque to
//! the rest of the crate.

use std::fmt;

use crate::terms::TermGroup;

/// Joining operator placed in front of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    Lead,
    And,
    Not,
}

impl Joiner {
    fn prefix(&self) -> &'static str {
        match self {
            Joiner::Lead => "",
            Joiner::And  => "AND",
            Joiner::Not  => "NOT",
        }
    }
}

/// Quote every term and OR them together inside parentheses.
pub fn comb_terms(terms: &[String]) -> String {
    let quoted: Vec<String> = terms
        .iter()
        .map(|t| t.trim().replace('"', ""))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    format!("({})", quoted.join("OR"))
}

fn component(terms: &[String], joiner: Joiner) -> String {
    if terms.iter().all(|t| t.trim().is_empty()) {
        return String::new();
    }
    format!("{}{}", joiner.prefix(), comb_terms(terms))
}

/// An encoded search expression, ready to hand to the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Synonyms OR-combined, exclusions NOT-combined.
    pub fn single(group: &TermGroup) -> Self {
        let mut q = component(group.synonyms(), Joiner::Lead);
        q.push_str(&component(group.exclusions(), Joiner::Not));
        SearchQuery(q)
    }

    /// Both groups' single queries joined with AND.
    pub fn pair(a: &TermGroup, b: &TermGroup) -> Self {
        let mut q = component(a.synonyms(), Joiner::Lead);
        q.push_str(&component(a.exclusions(), Joiner::Not));
        q.push_str(&component(b.synonyms(), Joiner::And));
        q.push_str(&component(b.exclusions(), Joiner::Not));
        SearchQuery(q)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
