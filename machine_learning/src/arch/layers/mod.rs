mod dropout;
mod graph_channel;
mod log_softmax;
mod residual;

pub use dropout::Dropout;
pub use graph_channel::GraphChannel;
pub use log_softmax::LogSoftmax;
pub use residual::ResidualConv;

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

use crate::Result;

/// Gives a view of a raw `(in + 1) × out` slice as the weights and biases of a layer.
///
/// # Arguments
/// * `dim` - The `(in, out)` dimension of the layer.
/// * `raw` - A slice of parameters.
///
/// # Returns
/// A tuple containing the weights and biases.
fn view_params(
    dim: (usize, usize),
    raw: &[f32],
) -> Result<(ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
    let w_size = dim.0 * dim.1;
    let (w_raw, b_raw) = raw.split_at(w_size.min(raw.len()));
    let weights = ArrayView2::from_shape(dim, w_raw)?;
    let biases = ArrayView1::from_shape(dim.1, b_raw)?;
    Ok((weights, biases))
}

/// Gives a view of a raw gradient slice as the delta weights and delta biases of a layer.
///
/// # Arguments
/// * `dim` - The `(in, out)` dimension of the layer.
/// * `raw` - A gradient slice.
///
/// # Returns
/// A tuple containing the delta weights and delta biases.
fn view_grad(
    dim: (usize, usize),
    raw: &mut [f32],
) -> Result<(ArrayViewMut2<'_, f32>, ArrayViewMut1<'_, f32>)> {
    let w_size = dim.0 * dim.1;
    let split = w_size.min(raw.len());
    let (dw_raw, db_raw) = raw.split_at_mut(split);
    let dw = ArrayViewMut2::from_shape(dim, dw_raw)?;
    let db = ArrayViewMut1::from_shape(dim.1, db_raw)?;
    Ok((dw, db))
}
