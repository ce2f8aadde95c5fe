use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A loss over the rows of a node level prediction selected by a mask of node indices.
pub trait LossFn {
    /// Computes the loss of `y_pred` against `labels` restricted to the nodes in `mask`.
    fn loss(&self, y_pred: ArrayView2<f32>, labels: &[usize], mask: &[usize]) -> Result<f32>;

    /// Computes the derivative of `loss` with respect to every entry of `y_pred`, rows
    /// outside of `mask` being zero.
    fn loss_prime(
        &self,
        y_pred: ArrayView2<f32>,
        labels: &[usize],
        mask: &[usize],
    ) -> Result<Array2<f32>>;
}
