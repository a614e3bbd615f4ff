// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Sparse Operators
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Compressed sparse row (CSR) operators.
//!
//! [`SparseBuilder`] collects entries row by row with additive semantics:
//! inserting the same (row, col) twice sums the values. This is what the
//! CMFD assembly needs, since a diagonal entry is built from absorption,
//! out-scatter and four face contributions. [`SparseBuilder::build`]
//! freezes the pattern into a [`CsrMatrix`] with sorted columns.

use cmfd_types::error::{CmfdError, CmfdResult};
use ndarray::Array2;

/// Row-wise accumulator for a sparse matrix.
#[derive(Debug, Clone)]
pub struct SparseBuilder {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseBuilder {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        SparseBuilder {
            n_rows,
            n_cols,
            rows: vec![Vec::new(); n_rows],
        }
    }

    /// Square builder with room for `per_row` entries in every row.
    pub fn with_row_capacity(n: usize, per_row: usize) -> Self {
        SparseBuilder {
            n_rows: n,
            n_cols: n,
            rows: (0..n).map(|_| Vec::with_capacity(per_row)).collect(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Add `value` to entry (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> CmfdResult<()> {
        if row >= self.n_rows || col >= self.n_cols {
            return Err(CmfdError::LinAlg(format!(
                "entry ({row}, {col}) outside {}x{} matrix",
                self.n_rows, self.n_cols
            )));
        }
        let entries = &mut self.rows[row];
        match entries.iter_mut().find(|(c, _)| *c == col) {
            Some((_, v)) => *v += value,
            None => entries.push((col, value)),
        }
        Ok(())
    }

    /// Drop all entries but keep the allocated rows.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.clear();
        }
    }

    pub fn build(&self) -> CsrMatrix {
        let nnz: usize = self.rows.iter().map(Vec::len).sum();
        let mut row_ptr = Vec::with_capacity(self.n_rows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);

        for row in &self.rows {
            let mut sorted = row.clone();
            sorted.sort_by_key(|&(c, _)| c);
            for (c, v) in sorted {
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }
}

/// Immutable CSR matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// n×n identity.
    pub fn identity(n: usize) -> Self {
        CsrMatrix {
            n_rows: n,
            n_cols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![1.0; n],
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// (column, value) pairs of one row, columns ascending.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_idx[span.clone()]
            .iter()
            .copied()
            .zip(self.values[span].iter().copied())
    }

    /// Entry (row, col); zero when not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.n_rows {
            return 0.0;
        }
        let span = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[span.clone()].binary_search(&col) {
            Ok(k) => self.values[span.start + k],
            Err(_) => 0.0,
        }
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n_rows.min(self.n_cols))
            .map(|i| self.get(i, i))
            .collect()
    }

    /// `out = A x`.
    pub fn matvec_into(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n_cols);
        debug_assert_eq!(out.len(), self.n_rows);
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.row(i).map(|(c, v)| v * x[c]).sum();
        }
    }

    pub fn matvec(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.n_rows];
        self.matvec_into(x, &mut out);
        out
    }

    pub fn transpose(&self) -> CsrMatrix {
        let mut builder = SparseBuilder::new(self.n_cols, self.n_rows);
        for i in 0..self.n_rows {
            for (c, v) in self.row(i) {
                builder.rows[c].push((i, v));
            }
        }
        builder.build()
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        for i in 0..self.n_rows {
            for (c, v) in self.row(i) {
                dense[[i, c]] = v;
            }
        }
        dense
    }

    /// True when every row's diagonal magnitude is at least the sum of
    /// its off-diagonal magnitudes.
    pub fn is_diagonally_dominant(&self) -> bool {
        (0..self.n_rows).all(|i| {
            let mut diag = 0.0;
            let mut off = 0.0;
            for (c, v) in self.row(i) {
                if c == i {
                    diag = v.abs();
                } else {
                    off += v.abs();
                }
            }
            diag + 1e-12 >= off
        })
    }
}
