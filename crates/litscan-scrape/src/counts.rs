//! Counting-mode results: two term registries and their co-occurrence matrix.

use serde::{Deserialize, Serialize};
use tracing::info;

use litscan_common::Result;

use crate::matrix::CooccurrenceMatrix;
use crate::scraper::ScrapeMeta;
use crate::terms::{Dimension, TermGroup, TermGroupSet, TermInput};

/// Term registries for both dimensions plus the sweep output.
///
/// With no B groups set the run is square: B mirrors A, and the matrix is
/// symmetric in its counts.
#[derive(Debug, Clone, Default)]
pub struct Counts {
    terms_a: TermGroupSet,
    terms_b: TermGroupSet,
    matrix: Option<CooccurrenceMatrix>,
    meta: Option<ScrapeMeta>,
}

impl Counts {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry_mut(&mut self, dim: Dimension) -> &mut TermGroupSet {
        match dim {
            Dimension::A => &mut self.terms_a,
            Dimension::B => &mut self.terms_b,
        }
    }

    pub fn set_terms<I, T>(&mut self, dim: Dimension, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<TermInput>,
    {
        self.registry_mut(dim).set_groups(inputs)?;
        self.matrix = None;
        Ok(())
    }

    pub fn set_term_groups(&mut self, dim: Dimension, groups: Vec<TermGroup>) -> Result<()> {
        self.registry_mut(dim).set_term_groups(groups)?;
        self.matrix = None;
        Ok(())
    }

    /// Results measured under the old exclusions are discarded, even when
    /// the new list is rejected.
    pub fn set_exclusions<I, T>(&mut self, dim: Dimension, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<TermInput>,
    {
        self.discard_results();
        self.registry_mut(dim).set_exclusions(inputs)
    }

    pub fn unset_terms(&mut self, dim: Dimension) {
        self.registry_mut(dim).unset_groups();
        self.matrix = None;
    }

    pub fn unset_exclusions(&mut self, dim: Dimension) {
        self.discard_results();
        self.registry_mut(dim).unset_exclusions();
    }

    fn discard_results(&mut self) {
        self.terms_a.reset_counts();
        self.terms_b.reset_counts();
        self.matrix = None;
        self.meta = None;
    }

    pub fn is_square(&self) -> bool {
        self.terms_b.is_empty()
    }

    /// The registry feeding `dim`; in square mode B resolves to A.
    pub fn terms(&self, dim: Dimension) -> &TermGroupSet {
        match dim {
            Dimension::B if !self.is_square() => &self.terms_b,
            _ => &self.terms_a,
        }
    }

    pub(crate) fn terms_mut(&mut self, dim: Dimension) -> &mut TermGroupSet {
        if self.is_square() {
            &mut self.terms_a
        } else {
            self.registry_mut(dim)
        }
    }

    pub fn matrix(&self) -> Option<&CooccurrenceMatrix> {
        self.matrix.as_ref()
    }

    pub(crate) fn matrix_mut(&mut self) -> Option<&mut CooccurrenceMatrix> {
        self.matrix.as_mut()
    }

    pub fn meta(&self) -> Option<&ScrapeMeta> {
        self.meta.as_ref()
    }

    pub(crate) fn set_meta(&mut self, meta: ScrapeMeta) {
        self.meta = Some(meta);
    }

    /// Reset single-term counts and allocate an unfilled matrix.
    pub(crate) fn prepare(&mut self) {
        self.terms_a.reset_counts();
        self.terms_b.reset_counts();
        let rows = self.terms(Dimension::A).len();
        let cols = self.terms(Dimension::B).len();
        self.matrix = Some(CooccurrenceMatrix::new(rows, cols));
        self.meta = None;
    }

    /// Highest-percentage partner of the group at `index` in `dim`.
    /// Returns the partner's index in the other dimension and the percentage.
    pub fn top_association(&self, dim: Dimension, index: usize) -> Option<(usize, f64)> {
        let matrix = self.matrix.as_ref()?;
        let line: Vec<Option<f64>> = match dim {
            Dimension::A if index < matrix.rows() => matrix.row_percentages(index).to_vec(),
            Dimension::B if index < matrix.cols() => matrix.col_percentages(index),
            _ => return None,
        };
        line.into_iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i, p)))
            .fold(None, |best: Option<(usize, f64)>, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
    }

    /// The group in `dim` with the largest single-term count.
    pub fn most_studied(&self, dim: Dimension) -> Option<(usize, u64)> {
        self.terms(dim)
            .counts()
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| (i, c)))
            .fold(None, |best: Option<(usize, u64)>, (i, c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((i, c)),
            })
    }

    /// Drop groups in `dim` whose single-term count is `<= n` (or was never
    /// measured), along with their matrix rows or columns.
    pub fn drop_below(&mut self, dim: Dimension, n: u64) {
        let keep: Vec<usize> = self
            .terms(dim)
            .counts()
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Some(c) if *c > n))
            .map(|(i, _)| i)
            .collect();

        let dropped = self.terms(dim).len() - keep.len();
        let square = self.is_square();
        self.terms_mut(dim).retain_indices(&keep);

        if let Some(matrix) = self.matrix.as_mut() {
            if square {
                matrix.retain_rows(&keep);
                matrix.retain_cols(&keep);
            } else {
                match dim {
                    Dimension::A => matrix.retain_rows(&keep),
                    Dimension::B => matrix.retain_cols(&keep),
                }
            }
        }
        info!(?dim, threshold = n, dropped, "Dropped low-count term groups");
    }

    /// Serializable view for storage.
    pub fn snapshot(&self) -> CountsSnapshot {
        let labels = |dim: Dimension| -> Vec<String> {
            self.terms(dim).labels().into_iter().map(String::from).collect()
        };
        CountsSnapshot {
            square: self.is_square(),
            labels_a: labels(Dimension::A),
            labels_b: labels(Dimension::B),
            counts_a: self.terms(Dimension::A).counts().to_vec(),
            counts_b: self.terms(Dimension::B).counts().to_vec(),
            matrix: self.matrix.clone(),
            meta: self.meta.clone(),
        }
    }
}

/// Persisted form of a counting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountsSnapshot {
    pub square: bool,
    pub labels_a: Vec<String>,
    pub labels_b: Vec<String>,
    pub counts_a: Vec<Option<u64>>,
    pub counts_b: Vec<Option<u64>>,
    pub matrix: Option<CooccurrenceMatrix>,
    pub meta: Option<ScrapeMeta>,
}
