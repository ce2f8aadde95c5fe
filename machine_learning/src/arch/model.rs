use std::ops::Range;

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::{Result, dataset::GraphInputs};

/// Whether stochastic layers are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// A named range of the flat parameter buffer holding one weight or bias tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTensor {
    pub name: String,
    pub range: Range<usize>,
    pub fan_out: usize,
}

/// A node classifier over a graph.
///
/// Parameters live outside of the model in a single flat buffer, the model only knows how
/// to slice it into tensors.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Returns the parameter tensors in registration order, their ranges cover
    /// `0..self.size()` without gaps.
    fn tensors(&self) -> &[ParamTensor];

    /// Computes the per node log class probabilities.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `inputs` - The node features and graph kernels.
    /// * `mode` - Whether dropout is active.
    /// * `rng` - The source of randomness for stochastic layers.
    ///
    /// # Returns
    /// A `nodes × classes` matrix of log probabilities.
    fn forward<R: Rng + ?Sized>(
        &mut self,
        params: &[f32],
        inputs: &GraphInputs,
        mode: Mode,
        rng: &mut R,
    ) -> Result<Array2<f32>>;

    /// Backpropagates the loss derivative of the last `forward` output, **overwriting**
    /// `grad` with the gradient with respect to `params`.
    ///
    /// # Arguments
    /// * `params` - The same parameters given on the last `forward`.
    /// * `grad` - A buffer as long as `params`.
    /// * `inputs` - The same inputs given on the last `forward`.
    /// * `d_out` - The loss derivative with respect to the log probabilities.
    fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        inputs: &GraphInputs,
        d_out: ArrayView2<f32>,
    ) -> Result<()>;
}
