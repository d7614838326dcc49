//! Term groups and the per-dimension registry that owns them.

use std::collections::HashSet;
use std::path::Path;

use litscan_common::{LitscanError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which side of a co-occurrence matrix a registry feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Rows.
    A,
    /// Columns.
    B,
}

/// A labelled set of synonymous search terms plus exclusion words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermGroup {
    label: String,
    synonyms: Vec<String>,
    exclusions: Vec<String>,
}

impl TermGroup {
    pub fn new(label: impl Into<String>, synonyms: Vec<String>) -> Result<Self> {
        let label = label.into();
        if synonyms.iter().all(|s| s.trim().is_empty()) {
            return Err(LitscanError::InconsistentData(format!(
                "Term group '{label}' has no synonyms"
            )));
        }
        Ok(Self { label, synonyms, exclusions: Vec::new() })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The first synonym is the canonical term.
    pub fn canonical(&self) -> &str {
        &self.synonyms[0]
    }

    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    pub fn set_exclusions(&mut self, exclusions: Vec<String>) {
        self.exclusions = exclusions;
    }
}

/// Either a single bare term or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermInput {
    Single(String),
    List(Vec<String>),
}

impl TermInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            TermInput::Single(term) => vec![term],
            TermInput::List(terms) => terms,
        }
    }
}

impl From<&str> for TermInput {
    fn from(term: &str) -> Self { TermInput::Single(term.to_string()) }
}

impl From<String> for TermInput {
    fn from(term: String) -> Self { TermInput::Single(term) }
}

impl From<Vec<String>> for TermInput {
    fn from(terms: Vec<String>) -> Self { TermInput::List(terms) }
}

impl From<Vec<&str>> for TermInput {
    fn from(terms: Vec<&str>) -> Self {
        TermInput::List(terms.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for TermInput {
    fn from(terms: &[&str]) -> Self {
        TermInput::List(terms.iter().map(|t| t.to_string()).collect())
    }
}

/// Ordered term groups for one dimension plus their single-term counts.
///
/// The count vector always has one slot per group; `None` means the group
/// has not been measured yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermGroupSet {
    groups: Vec<TermGroup>,
    has_exclusions: bool,
    counts: Vec<Option<u64>>,
}

impl TermGroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all groups; each group's label is its first synonym.
    /// Previously set exclusions are dropped.
    pub fn set_groups<I, T>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<TermInput>,
    {
        let groups = inputs
            .into_iter()
            .map(|input| {
                let synonyms = input.into().into_vec();
                let label = synonyms.first().cloned().unwrap_or_default();
                TermGroup::new(label, synonyms)
            })
            .collect::<Result<Vec<_>>>()?;
        self.set_term_groups(groups)
    }

    /// Replace all groups with explicitly labelled ones.
    pub fn set_term_groups(&mut self, groups: Vec<TermGroup>) -> Result<()> {
        let mut seen = HashSet::new();
        for group in &groups {
            if !seen.insert(group.label()) {
                return Err(LitscanError::InconsistentData(format!(
                    "Duplicate term group label '{}'",
                    group.label()
                )));
            }
        }

        if !self.groups.is_empty() {
            debug!(n_groups = self.groups.len(), "Unloading previous term groups");
        }
        self.counts = vec![None; groups.len()];
        self.groups = groups
            .into_iter()
            .map(|mut g| {
                g.exclusions.clear();
                g
            })
            .collect();
        self.has_exclusions = false;
        Ok(())
    }

    /// Pair exclusion lists positionally with the groups. The pairing must be
    /// total; on mismatch the set is left with no exclusions.
    pub fn set_exclusions<I, T>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<TermInput>,
    {
        self.unset_exclusions();

        let exclusions: Vec<Vec<String>> = inputs.into_iter().map(|e| e.into().into_vec()).collect();
        if exclusions.len() != self.groups.len() {
            return Err(LitscanError::InconsistentData(format!(
                "Mismatch in number of exclusions ({}) and term groups ({})",
                exclusions.len(),
                self.groups.len()
            )));
        }

        for (group, excl) in self.groups.iter_mut().zip(exclusions) {
            group.exclusions = excl;
        }
        self.has_exclusions = true;
        Ok(())
    }

    pub fn unset_groups(&mut self) {
        self.groups.clear();
        self.counts.clear();
        self.has_exclusions = false;
    }

    pub fn unset_exclusions(&mut self) {
        for group in &mut self.groups {
            group.exclusions.clear();
        }
        self.has_exclusions = false;
    }

    pub fn groups(&self) -> &[TermGroup] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&TermGroup> {
        self.groups.get(index)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.groups.iter().map(TermGroup::label).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn has_exclusions(&self) -> bool {
        self.has_exclusions
    }

    pub fn counts(&self) -> &[Option<u64>] {
        &self.counts
    }

    pub fn count(&self, index: usize) -> Option<u64> {
        self.counts.get(index).copied().flatten()
    }

    pub fn set_count(&mut self, index: usize, count: u64) {
        self.counts[index] = Some(count);
    }

    /// Mark every group as not yet measured.
    pub fn reset_counts(&mut self) {
        self.counts = vec![None; self.groups.len()];
    }

    /// Keep only the groups at `indices`, in that order.
    pub(crate) fn retain_indices(&mut self, indices: &[usize]) {
        self.groups = indices.iter().map(|&i| self.groups[i].clone()).collect();
        self.counts = indices.iter().map(|&i| self.counts[i]).collect();
    }
}

/// Parse term groups: one group per line, synonyms comma-separated.
/// Blank lines and `#` comments are skipped.
pub fn parse_terms(content: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(split_line)
        .collect()
}

/// Parse exclusion lists for `n_groups` term groups: one per line,
/// positionally paired. A blank line means the group has no exclusions.
/// Blank lines past the last group are dropped.
pub fn parse_exclusions(content: &str, n_groups: usize) -> Vec<Vec<String>> {
    let mut lists: Vec<Vec<String>> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .map(split_line)
        .collect();
    while lists.len() > n_groups && lists.last().is_some_and(Vec::is_empty) {
        lists.pop();
    }
    lists
}

fn split_line(line: &str) -> Vec<String> {
    line.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

pub fn load_terms_file(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    Ok(parse_terms(&std::fs::read_to_string(path)?))
}

pub fn load_exclusions_file(path: impl AsRef<Path>, n_groups: usize) -> Result<Vec<Vec<String>>> {
    Ok(parse_exclusions(&std::fs::read_to_string(path)?, n_groups))
}
