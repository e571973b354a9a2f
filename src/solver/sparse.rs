use rayon::prelude::*;

use super::vector::DenseVector;

/// Initial per-row storage, grown by half its size on overflow.
const INITIAL_ROW_CAPACITY: usize = 16;

/// One matrix row: column indices kept sorted, coefficients stored alongside.
///
/// Lookups and inserts scan linearly. Rows in a seam system reference only the
/// bilinear corners of the pixels they are paired with, so they stay short.
#[derive(Debug, Clone, Default)]
pub struct SparseRow {
    columns: Vec<usize>,
    coefficients: Vec<f32>,
}

impl SparseRow {
    /// Number of stored (explicit) entries.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Stored column indices in ascending order.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Position of the first stored column `>= column`.
    fn lower_bound(&self, column: usize) -> usize {
        self.columns
            .iter()
            .position(|&c| c >= column)
            .unwrap_or(self.columns.len())
    }

    /// Value at `column`, zero when not stored.
    pub fn get(&self, column: usize) -> f32 {
        let i = self.lower_bound(column);
        match self.columns.get(i) {
            Some(&c) if c == column => self.coefficients[i],
            _ => 0.0,
        }
    }

    /// Mutable slot for `column`, inserting a zero entry if absent.
    pub fn entry(&mut self, column: usize) -> &mut f32 {
        let i = self.lower_bound(column);
        if self.columns.get(i) != Some(&column) {
            self.grow_if_full();
            self.columns.insert(i, column);
            self.coefficients.insert(i, 0.0);
        }
        &mut self.coefficients[i]
    }

    fn grow_if_full(&mut self) {
        let capacity = self.columns.capacity();
        if self.columns.len() < capacity {
            return;
        }
        let additional = if capacity == 0 {
            INITIAL_ROW_CAPACITY
        } else {
            (capacity / 2).max(1)
        };
        self.columns.reserve_exact(additional);
        self.coefficients.reserve_exact(additional);
    }

    /// Dot product of this row with a dense vector.
    fn dot(&self, x: &DenseVector) -> f32 {
        self.columns
            .iter()
            .zip(&self.coefficients)
            .map(|(&c, &a)| x[c] * a)
            .sum()
    }
}

/// Row-major sparse matrix.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    rows: Vec<SparseRow>,
    num_cols: usize,
}

impl SparseMatrix {
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            rows: vec![SparseRow::default(); num_rows],
            num_cols,
        }
    }

    /// Square `n x n` matrix.
    pub fn square(n: usize) -> Self {
        Self::new(n, n)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn row(&self, row: usize) -> &SparseRow {
        &self.rows[row]
    }

    /// Number of explicitly stored entries across all rows.
    pub fn non_zero_count(&self) -> usize {
        self.rows.iter().map(SparseRow::len).sum()
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(col < self.num_cols, "column {col} out of range");
        self.rows[row].get(col)
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        *self.entry(row, col) = value;
    }

    /// Accumulate `value` into `(row, col)`.
    pub fn add(&mut self, row: usize, col: usize, value: f32) {
        *self.entry(row, col) += value;
    }

    fn entry(&mut self, row: usize, col: usize) -> &mut f32 {
        assert!(col < self.num_cols, "column {col} out of range");
        self.rows[row].entry(col)
    }

    /// `out = self * x`, one parallel task per row.
    pub fn mul_vec(&self, x: &DenseVector, out: &mut DenseVector) {
        assert_eq!(x.len(), self.num_cols, "input vector must match column count");
        assert_eq!(out.len(), self.rows.len(), "output vector must match row count");

        out.as_mut_slice()
            .par_iter_mut()
            .zip(self.rows.par_iter())
            .for_each(|(o, row)| *o = row.dot(x));
    }

    /// Whether `A[i][j] == A[j][i]` for every stored entry, within `eps`.
    pub fn is_symmetric(&self, eps: f32) -> bool {
        self.rows.iter().enumerate().all(|(i, row)| {
            row.columns
                .iter()
                .zip(&row.coefficients)
                .all(|(&j, &a)| j < self.rows.len() && (self.rows[j].get(i) - a).abs() <= eps)
        })
    }
}
