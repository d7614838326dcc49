//! Co-occurrence matrix storage.

use serde::{Deserialize, Serialize};

/// Joint counts and percentages indexed `[A-group][B-group]`, row-major.
///
/// `None` marks a cell that has not been filled. A filled count with an
/// unfilled percentage means the normalising single-term count was zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooccurrenceMatrix {
    rows: usize,
    cols: usize,
    counts: Vec<Option<u64>>,
    percentages: Vec<Option<f64>>,
}

impl CooccurrenceMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            counts: vec![None; rows * cols],
            percentages: vec![None; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    pub fn count(&self, row: usize, col: usize) -> Option<u64> {
        self.counts[self.idx(row, col)]
    }

    pub fn percentage(&self, row: usize, col: usize) -> Option<f64> {
        self.percentages[self.idx(row, col)]
    }

    /// Store a joint count and derive its percentage against `denominator`.
    pub fn fill(&mut self, row: usize, col: usize, count: u64, denominator: u64) {
        let i = self.idx(row, col);
        self.counts[i] = Some(count);
        self.percentages[i] = percentage(count, denominator);
    }

    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        self.count(row, col).is_some()
    }

    /// True once every cell holds a count.
    pub fn is_complete(&self) -> bool {
        self.counts.iter().all(Option::is_some)
    }

    pub fn row_counts(&self, row: usize) -> &[Option<u64>] {
        &self.counts[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_percentages(&self, row: usize) -> &[Option<f64>] {
        &self.percentages[row * self.cols..(row + 1) * self.cols]
    }

    pub fn col_percentages(&self, col: usize) -> Vec<Option<f64>> {
        (0..self.rows).map(|r| self.percentage(r, col)).collect()
    }

    /// Keep only the listed rows, in order.
    pub fn retain_rows(&mut self, keep: &[usize]) {
        let mut counts = Vec::with_capacity(keep.len() * self.cols);
        let mut percentages = Vec::with_capacity(keep.len() * self.cols);
        for &r in keep {
            counts.extend_from_slice(self.row_counts(r));
            percentages.extend_from_slice(self.row_percentages(r));
        }
        self.rows = keep.len();
        self.counts = counts;
        self.percentages = percentages;
    }

    /// Keep only the listed columns, in order.
    pub fn retain_cols(&mut self, keep: &[usize]) {
        let mut counts = Vec::with_capacity(self.rows * keep.len());
        let mut percentages = Vec::with_capacity(self.rows * keep.len());
        for r in 0..self.rows {
            for &c in keep {
                counts.push(self.count(r, c));
                percentages.push(self.percentage(r, c));
            }
        }
        self.cols = keep.len();
        self.counts = counts;
        self.percentages = percentages;
    }
}

fn percentage(count: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(count as f64 / denominator as f64)
    }
}
