//! Compressed sparse row view of an interaction matrix, the trainer input.

use crate::common::Id;
use crate::error::{RecError, Result};
use crate::interactions::InteractionMatrix;

/// CSR matrix with `i64` row pointers and `i32` column indices.
///
/// Column indices within a row are strictly ascending and below `n_cols`;
/// `indptr` has `n_rows + 1` non-decreasing entries from 0 to `nnz`. Every
/// constructor upholds this, and the trainer relies on it for raw row access.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    indptr: Vec<i64>,
    indices: Vec<i32>,
    data: Vec<f32>,
    n_rows: usize,
    n_cols: usize,
}

impl CsrMatrix {
    /// Wrap raw CSR arrays after checking their structure.
    pub fn new(
        indptr: Vec<i64>,
        indices: Vec<i32>,
        data: Vec<f32>,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Self> {
        if indptr.len() != n_rows + 1 {
            return Err(RecError::DimensionMismatch {
                expected: format!("{} row pointers", n_rows + 1),
                actual: format!("{}", indptr.len()),
            });
        }
        if indices.len() != data.len() {
            return Err(RecError::DimensionMismatch {
                expected: format!("{} values", indices.len()),
                actual: format!("{}", data.len()),
            });
        }
        if indptr[0] != 0 || indptr[n_rows] != indices.len() as i64 {
            return Err(RecError::invalid(
                "indptr",
                format!("{}..{}", indptr[0], indptr[n_rows]),
                &format!("must span 0..{}", indices.len()),
            ));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(RecError::invalid("indptr", "decreasing", "must be non-decreasing"));
        }
        if n_cols > i32::MAX as usize {
            return Err(RecError::invalid("n_cols", n_cols, "must fit in i32"));
        }
        for w in indptr.windows(2) {
            let cols = &indices[w[0] as usize..w[1] as usize];
            if let Some(&bad) = cols.iter().find(|&&c| c < 0 || c as usize >= n_cols) {
                return Err(RecError::invalid(
                    "indices",
                    bad,
                    &format!("must lie in 0..{n_cols}"),
                ));
            }
            if cols.windows(2).any(|p| p[0] >= p[1]) {
                return Err(RecError::invalid(
                    "indices",
                    "unsorted row",
                    "must be strictly ascending within a row",
                ));
            }
        }
        Ok(Self {
            indptr,
            indices,
            data,
            n_rows,
            n_cols,
        })
    }

    /// Keep the non-zero cells of a dense interaction matrix.
    pub fn from_dense<U: Id, I: Id>(matrix: &InteractionMatrix<U, I>) -> Self {
        let (n_rows, n_cols) = matrix.shape();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0i64);
        for row in 0..n_rows {
            for (col, &v) in matrix.row(row).iter().enumerate() {
                if v != 0.0 {
                    indices.push(col as i32);
                    data.push(v);
                }
            }
            indptr.push(indices.len() as i64);
        }
        tracing::debug!(n_rows, n_cols, nnz = indices.len(), "converted to csr");
        Self {
            indptr,
            indices,
            data,
            n_rows,
            n_cols,
        }
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn indptr(&self) -> &[i64] {
        &self.indptr
    }

    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// `(column indices, values)` of row `row`.
    pub fn row(&self, row: usize) -> (&[i32], &[f32]) {
        let start = self.indptr[row] as usize;
        let end = self.indptr[row + 1] as usize;
        (&self.indices[start..end], &self.data[start..end])
    }

    pub fn has_interaction(&self, row: usize, col: usize) -> bool {
        self.row(row).0.binary_search(&(col as i32)).is_ok()
    }

    /// Stored value at `(row, col)`, `None` for an implicit zero.
    pub fn value(&self, row: usize, col: usize) -> Option<f32> {
        let (cols, vals) = self.row(row);
        cols.binary_search(&(col as i32)).ok().map(|k| vals[k])
    }

    /// Row of the `nnz`-th stored entry, for sampling entries uniformly.
    pub(crate) fn row_of_entry(&self, entry: usize) -> usize {
        // First row whose end pointer is past `entry`.
        self.indptr[1..].partition_point(|&end| end as usize <= entry)
    }
}
