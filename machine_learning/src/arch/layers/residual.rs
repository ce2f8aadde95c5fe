use ndarray::{Array2, ArrayView2, Axis, linalg};

use super::{view_grad, view_params};
use crate::{MlErr, Result, sparse::GraphOperator};

/// The residual graph convolution `R · H W + b`, where `R` blends each node with its
/// smoothed neighbourhood.
#[derive(Clone, Debug)]
pub struct ResidualConv {
    dim: (usize, usize),
    size: usize,

    // Forward metadata
    h: Option<Array2<f32>>,
}

impl ResidualConv {
    /// Creates a new `ResidualConv`.
    ///
    /// # Arguments
    /// * `dim` - The `(in, out)` feature dimension.
    pub fn new(dim: (usize, usize)) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            h: None,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn forward<K>(&mut self, params: &[f32], h: Array2<f32>, op: &K) -> Result<Array2<f32>>
    where
        K: GraphOperator + ?Sized,
    {
        self.check_params(params.len())?;
        if h.ncols() != self.dim.0 {
            return Err(MlErr::ShapeMismatch {
                what: "residual input",
                got: h.dim(),
                expected: (h.nrows(), self.dim.0),
            });
        }

        let (w, b) = view_params(self.dim, params)?;
        let mut out = op.apply(h.dot(&w).view())?;
        out += &b;

        self.h = Some(h);
        Ok(out)
    }

    /// Backpropagates `d` through the layer.
    ///
    /// # Returns
    /// The loss derivative with respect to this layer's input.
    pub fn backward<K>(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        op: &K,
        d: ArrayView2<f32>,
    ) -> Result<Array2<f32>>
    where
        K: GraphOperator + ?Sized,
    {
        self.check_params(params.len())?;
        self.check_params(grad.len())?;
        let h = self.h.as_ref().ok_or(MlErr::MissingForward {
            layer: "residual convolution",
        })?;

        let d_hw = op.apply_transpose(d)?;
        let (w, _) = view_params(self.dim, params)?;
        let (mut dw, mut db) = view_grad(self.dim, grad)?;

        linalg::general_mat_mul(1.0, &h.t(), &d_hw, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        Ok(d_hw.dot(&w.t()))
    }

    fn check_params(&self, len: usize) -> Result<()> {
        if len != self.size {
            return Err(MlErr::SizeMismatch {
                what: "residual parameters",
                got: len,
                expected: self.size,
            });
        }

        Ok(())
    }
}
