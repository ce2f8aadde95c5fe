use ndarray::{Array2, ArrayView2, Axis, linalg};

use super::{view_grad, view_params};
use crate::{MlErr, Result, arch::activations::ActFn, sparse::GraphOperator};

/// A single graph convolution channel `act(K · X W + b)`.
///
/// The kernel `K` is given on each call, so the same layer type serves both the low pass
/// (powers of the adjacency) and the band pass (scattering wavelets) channels.
#[derive(Clone, Debug)]
pub struct GraphChannel {
    dim: (usize, usize),
    act_fn: ActFn,
    size: usize,

    // Forward metadata
    z: Option<Array2<f32>>,
}

impl GraphChannel {
    /// Creates a new `GraphChannel`.
    ///
    /// # Arguments
    /// * `dim` - The `(in, out)` feature dimension.
    /// * `act_fn` - The non linearity applied after the convolution.
    pub fn new(dim: (usize, usize), act_fn: ActFn) -> Self {
        Self {
            dim,
            act_fn,
            size: (dim.0 + 1) * dim.1,
            z: None,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Makes a forward pass through the channel.
    ///
    /// # Arguments
    /// * `params` - This layer's weights followed by its biases.
    /// * `x` - The `nodes × in` input.
    /// * `op` - The graph kernel to convolve with.
    ///
    /// # Returns
    /// The `nodes × out` activations.
    pub fn forward<K>(&mut self, params: &[f32], x: ArrayView2<f32>, op: &K) -> Result<Array2<f32>>
    where
        K: GraphOperator + ?Sized,
    {
        self.check_params(params.len())?;
        if x.ncols() != self.dim.0 {
            return Err(MlErr::ShapeMismatch {
                what: "graph channel input",
                got: x.dim(),
                expected: (x.nrows(), self.dim.0),
            });
        }

        let (w, b) = view_params(self.dim, params)?;
        let mut z = op.apply(x.dot(&w).view())?;
        z += &b;

        let a = z.mapv(|z| self.act_fn.f(z));
        self.z = Some(z);
        Ok(a)
    }

    /// Backpropagates `d` through the channel, writing this layer's gradient.
    ///
    /// The channel sits right after the input features, so no delta is propagated further.
    ///
    /// # Arguments
    /// * `grad` - This layer's slice of the gradient buffer.
    /// * `x` - The same input given on the last `forward`.
    /// * `op` - The same graph kernel given on the last `forward`.
    /// * `d` - The loss derivative with respect to this channel's output.
    pub fn backward<K>(
        &mut self,
        grad: &mut [f32],
        x: ArrayView2<f32>,
        op: &K,
        d: ArrayView2<f32>,
    ) -> Result<()>
    where
        K: GraphOperator + ?Sized,
    {
        self.check_params(grad.len())?;
        let z = self.z.as_ref().ok_or(MlErr::MissingForward {
            layer: "graph channel",
        })?;

        if d.dim() != z.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "graph channel delta",
                got: d.dim(),
                expected: z.dim(),
            });
        }

        let mut d = d.to_owned();
        d.zip_mut_with(z, |d, &z| *d *= self.act_fn.df(z));

        let d_xw = op.apply_transpose(d.view())?;
        let (mut dw, mut db) = view_grad(self.dim, grad)?;
        linalg::general_mat_mul(1.0, &x.t(), &d_xw, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        Ok(())
    }

    fn check_params(&self, len: usize) -> Result<()> {
        if len != self.size {
            return Err(MlErr::SizeMismatch {
                what: "graph channel parameters",
                got: len,
                expected: self.size,
            });
        }

        Ok(())
    }
}
