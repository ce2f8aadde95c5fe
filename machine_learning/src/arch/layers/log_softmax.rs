use ndarray::{Array2, ArrayView2, Axis};

use crate::{MlErr, Result};

/// Row wise `log(softmax(z))`, turning class scores into log probabilities.
#[derive(Clone, Debug, Default)]
pub struct LogSoftmax {
    out: Option<Array2<f32>>,
}

impl LogSoftmax {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, mut z: Array2<f32>) -> Array2<f32> {
        for mut row in z.axis_iter_mut(Axis(0)) {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let log_sum = row.mapv(|v| (v - max).exp()).sum().ln();
            row.mapv_inplace(|v| (v - max) - log_sum);
        }

        self.out = Some(z.clone());
        z
    }

    /// Maps `d` (with respect to the log probabilities) to the derivative with respect to
    /// the scores: `d - softmax · Σ d`.
    pub fn backward(&mut self, d: ArrayView2<f32>) -> Result<Array2<f32>> {
        let out = self.out.as_ref().ok_or(MlErr::MissingForward {
            layer: "log softmax",
        })?;

        if d.dim() != out.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "log softmax delta",
                got: d.dim(),
                expected: out.dim(),
            });
        }

        let sums = d.sum_axis(Axis(1)).insert_axis(Axis(1));
        let mut dz = out.mapv(f32::exp);
        dz *= &sums;
        Ok(&d - &dz)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn rows_are_normalized_distributions() {
        let mut layer = LogSoftmax::new();
        let out = layer.forward(array![[1., 2., 3.], [1000., 1000., 1000.]]);

        for row in out.axis_iter(Axis(0)) {
            let total: f32 = row.iter().map(|v| v.exp()).sum();
            assert!((total - 1.).abs() < 1e-5);
        }

        assert!((out[[1, 0]] - (1f32 / 3.).ln()).abs() < 1e-5);
    }

    #[test]
    fn backward_rows_sum_to_zero() {
        let mut layer = LogSoftmax::new();
        layer.forward(array![[0.3, -1.2, 0.8], [2.0, 0.1, -0.4]]);

        // Σⱼ (dⱼ - pⱼ Σ d) = Σ d - Σ d, since softmax sums to one.
        let dz = layer
            .backward(array![[1., 1., 1.], [-2., 0.5, 3.]].view())
            .unwrap();
        for row in dz.axis_iter(Axis(0)) {
            assert!(row.sum().abs() < 1e-5);
        }

        // A constant delta doesn't vanish: dz = c (1 - 3p).
        assert!(dz.row(0).iter().any(|v| v.abs() > 1e-3));
    }

    #[test]
    fn large_equal_scores_keep_precision() {
        let mut layer = LogSoftmax::new();
        let out = layer.forward(array![[1000., 1000., 1000.], [-1000., -1000., -1000.]]);

        let expected = -(3f32.ln());
        assert!(out.iter().all(|v| (v - expected).abs() < 1e-6));

        for row in out.axis_iter(Axis(0)) {
            let total: f32 = row.iter().map(|v| v.exp()).sum();
            assert!((total - 1.).abs() < 1e-6);
        }
    }
}
