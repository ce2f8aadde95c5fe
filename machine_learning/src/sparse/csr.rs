use ndarray::{Array2, ArrayView2, ArrayViewMut1, Axis, parallel::prelude::*};
use serde::Serialize;

use crate::{MlErr, Result};

/// How sparse-dense products are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Backend {
    /// Plain row by row loop on the calling thread.
    Serial,
    /// Rows are partitioned across the rayon pool.
    #[default]
    Rayon,
}

/// A compressed sparse row matrix of `f32` values.
///
/// Rows are written independently during a product, so both backends yield the exact same
/// output.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
    backend: Backend,
}

impl CsrMatrix {
    /// Builds a new `CsrMatrix` from `(row, col, value)` triplets.
    ///
    /// Repeated coordinates are summed up.
    ///
    /// # Arguments
    /// * `shape` - The `(rows, cols)` of the matrix.
    /// * `triplets` - The non zero entries.
    ///
    /// # Returns
    /// A new `CsrMatrix` or an error if any coordinate lies outside of `shape`.
    pub fn from_triplets<I>(shape: (usize, usize), triplets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f32)>,
    {
        let (nrows, ncols) = shape;
        let mut entries: Vec<_> = triplets.into_iter().collect();

        for &(r, c, _) in &entries {
            if r >= nrows {
                return Err(MlErr::IndexOutOfBounds {
                    what: "sparse row",
                    index: r,
                    len: nrows,
                });
            }

            if c >= ncols {
                return Err(MlErr::IndexOutOfBounds {
                    what: "sparse column",
                    index: c,
                    len: ncols,
                });
            }
        }

        entries.sort_by_key(|&(r, c, _)| (r, c));

        let mut indptr = vec![0; nrows + 1];
        let mut indices = Vec::with_capacity(entries.len());
        let mut values: Vec<f32> = Vec::with_capacity(entries.len());
        let mut last = None;

        for (r, c, v) in entries {
            if last == Some((r, c)) {
                if let Some(acc) = values.last_mut() {
                    *acc += v;
                }
                continue;
            }

            last = Some((r, c));
            indptr[r + 1] += 1;
            indices.push(c);
            values.push(v);
        }

        for r in 0..nrows {
            indptr[r + 1] += indptr[r];
        }

        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            values,
            backend: Backend::default(),
        })
    }

    /// Returns the `n × n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self {
            nrows: n,
            ncols: n,
            indptr: (0..=n).collect(),
            indices: (0..n).collect(),
            values: vec![1.; n],
            backend: Backend::default(),
        }
    }

    /// Sets the backend used by `mul_dense`.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Returns the amount of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterates over the `(col, value)` entries stored in row `r`.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let span = self.indptr[r]..self.indptr[r + 1];
        self.indices[span.clone()]
            .iter()
            .copied()
            .zip(self.values[span].iter().copied())
    }

    /// Returns the value stored at `(r, c)`, zero if absent.
    pub fn get(&self, r: usize, c: usize) -> f32 {
        if r >= self.nrows {
            return 0.;
        }

        let span = self.indptr[r]..self.indptr[r + 1];
        match self.indices[span.clone()].binary_search(&c) {
            Ok(pos) => self.values[span.start + pos],
            Err(_) => 0.,
        }
    }

    /// Sums up the values of each row.
    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.nrows).map(|r| self.row(r).map(|(_, v)| v).sum()).collect()
    }

    /// Returns the transposed matrix, keeping the same backend.
    pub fn transpose(&self) -> Self {
        let mut indptr = vec![0; self.ncols + 1];
        for &c in &self.indices {
            indptr[c + 1] += 1;
        }

        for c in 0..self.ncols {
            indptr[c + 1] += indptr[c];
        }

        let mut next = indptr.clone();
        let mut indices = vec![0; self.nnz()];
        let mut values = vec![0.; self.nnz()];

        for r in 0..self.nrows {
            for (c, v) in self.row(r) {
                let dst = next[c];
                indices[dst] = r;
                values[dst] = v;
                next[c] += 1;
            }
        }

        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            indptr,
            indices,
            values,
            backend: self.backend,
        }
    }

    /// Computes the sparse-dense product `self · x`.
    ///
    /// # Arguments
    /// * `x` - A dense matrix with as many rows as this matrix has columns.
    ///
    /// # Returns
    /// The dense product or an error if the inner dimensions differ.
    pub fn mul_dense(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.nrows() != self.ncols {
            return Err(MlErr::ShapeMismatch {
                what: "sparse product",
                got: x.dim(),
                expected: (self.ncols, x.ncols()),
            });
        }

        let mut out = Array2::zeros((self.nrows, x.ncols()));

        match self.backend {
            Backend::Serial => out
                .axis_iter_mut(Axis(0))
                .enumerate()
                .for_each(|(r, row)| self.accumulate_row(r, &x, row)),
            Backend::Rayon => out
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(r, row)| self.accumulate_row(r, &x, row)),
        }

        Ok(out)
    }

    fn accumulate_row(&self, r: usize, x: &ArrayView2<f32>, mut out: ArrayViewMut1<f32>) {
        for (c, v) in self.row(r) {
            out.scaled_add(v, &x.row(c));
        }
    }
}
