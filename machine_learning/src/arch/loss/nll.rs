use ndarray::{Array2, ArrayView1, ArrayView2};

use super::LossFn;
use crate::{MlErr, Result};

/// Negative log likelihood over log probabilities, averaged over the masked nodes.
#[derive(Default, Clone, Copy, Debug)]
pub struct NllLoss;

impl NllLoss {
    /// Returns a new `NllLoss`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for NllLoss {
    fn loss(&self, y_pred: ArrayView2<f32>, labels: &[usize], mask: &[usize]) -> Result<f32> {
        check_mask(y_pred, labels, mask)?;

        let total: f32 = mask.iter().map(|&i| -y_pred[[i, labels[i]]]).sum();
        Ok(total / mask.len() as f32)
    }

    fn loss_prime(
        &self,
        y_pred: ArrayView2<f32>,
        labels: &[usize],
        mask: &[usize],
    ) -> Result<Array2<f32>> {
        check_mask(y_pred, labels, mask)?;

        let mut d = Array2::zeros(y_pred.dim());
        let scale = -1. / mask.len() as f32;

        for &i in mask {
            d[[i, labels[i]]] += scale;
        }

        Ok(d)
    }
}

/// Computes the fraction of nodes in `mask` whose highest scoring class is their label.
///
/// Ties resolve to the lowest class id. The ratio is kept in `f64` so it prints exactly.
pub fn accuracy(y_pred: ArrayView2<f32>, labels: &[usize], mask: &[usize]) -> Result<f64> {
    check_mask(y_pred, labels, mask)?;

    let correct = mask
        .iter()
        .filter(|&&i| argmax(y_pred.row(i)) == labels[i])
        .count();

    Ok(correct as f64 / mask.len() as f64)
}

fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;
    for (j, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = j;
        }
    }

    best
}

fn check_mask(y_pred: ArrayView2<f32>, labels: &[usize], mask: &[usize]) -> Result<()> {
    if mask.is_empty() {
        return Err(MlErr::EmptyMask { what: "node" });
    }

    if labels.len() != y_pred.nrows() {
        return Err(MlErr::SizeMismatch {
            what: "labels",
            got: labels.len(),
            expected: y_pred.nrows(),
        });
    }

    for &i in mask {
        if i >= y_pred.nrows() {
            return Err(MlErr::IndexOutOfBounds {
                what: "node",
                index: i,
                len: y_pred.nrows(),
            });
        }

        if labels[i] >= y_pred.ncols() {
            return Err(MlErr::IndexOutOfBounds {
                what: "class",
                index: labels[i],
                len: y_pred.ncols(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn log_probs() -> Array2<f32> {
        array![[0.9f32, 0.1], [0.2, 0.8], [0.6, 0.4]].mapv(f32::ln)
    }

    #[test]
    fn loss_only_counts_masked_rows() {
        let y = log_probs();
        let labels = [0, 1, 1];

        let loss = NllLoss.loss(y.view(), &labels, &[0, 1]).unwrap();
        let expected = -(0.9f32.ln() + 0.8f32.ln()) / 2.;
        assert!((loss - expected).abs() < 1e-6);
    }

    #[test]
    fn loss_prime_is_sparse() {
        let y = log_probs();
        let d = NllLoss.loss_prime(y.view(), &[0, 1, 1], &[2]).unwrap();

        assert_eq!(d, array![[0., 0.], [0., 0.], [0., -1.]]);
    }

    #[test]
    fn accuracy_within_unit_interval() {
        let y = log_probs();

        assert_eq!(accuracy(y.view(), &[0, 1, 1], &[0, 1, 2]).unwrap(), 2. / 3.);
        assert_eq!(accuracy(y.view(), &[0, 1, 0], &[0, 1, 2]).unwrap(), 1.);
        assert_eq!(accuracy(y.view(), &[1, 0, 1], &[0, 1, 2]).unwrap(), 0.);
    }

    #[test]
    fn invalid_masks_fail() {
        let y = log_probs();

        assert!(matches!(
            NllLoss.loss(y.view(), &[0, 1, 1], &[]),
            Err(MlErr::EmptyMask { .. })
        ));
        assert!(matches!(
            accuracy(y.view(), &[0, 1, 1], &[3]),
            Err(MlErr::IndexOutOfBounds { what: "node", .. })
        ));
        assert!(matches!(
            NllLoss.loss(y.view(), &[0, 2, 1], &[1]),
            Err(MlErr::IndexOutOfBounds { what: "class", .. })
        ));
    }
}
