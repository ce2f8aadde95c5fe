use std::collections::BTreeSet;

use machine_learning::{Result, sparse::CsrMatrix};
use ndarray::{Array2, Axis};
use serde::Serialize;

/// The symmetric, binary and loop free links of a graph, both directions included.
pub(crate) type Links = BTreeSet<(usize, usize)>;

/// How the adjacency is normalized into the model's low pass kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Normalization {
    /// `D̃^-1/2 (A + I) D̃^-1/2`, where `D̃` holds the degrees of `A + I`.
    #[default]
    AugNormAdj,
}

impl Normalization {
    /// Normalizes the adjacency given by `links`.
    ///
    /// # Arguments
    /// * `links` - The graph's links.
    /// * `n` - The amount of nodes.
    pub(crate) fn adjacency(&self, links: &Links, n: usize) -> Result<CsrMatrix> {
        match self {
            Normalization::AugNormAdj => {
                let inv_sqrt: Vec<f32> = augmented_degrees(links, n)
                    .into_iter()
                    .map(|d| 1. / d.sqrt())
                    .collect();

                let entries = with_self_loops(links, n).map(|(u, v)| (u, v, inv_sqrt[u] * inv_sqrt[v]));
                CsrMatrix::from_triplets((n, n), entries)
            }
        }
    }
}

/// Builds `Ã = D̃^-1 (A + I)`, the row stochastic adjacency with self loops.
pub(crate) fn row_normalized_with_loops(links: &Links, n: usize) -> Result<CsrMatrix> {
    let degrees = augmented_degrees(links, n);
    let entries = with_self_loops(links, n).map(|(u, v)| (u, v, 1. / degrees[u]));
    CsrMatrix::from_triplets((n, n), entries)
}

/// The degrees of `A + I`, always at least 1.
fn augmented_degrees(links: &Links, n: usize) -> Vec<f32> {
    let mut degrees = vec![1.; n];
    for &(u, _) in links {
        degrees[u] += 1.;
    }

    degrees
}

fn with_self_loops(links: &Links, n: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    links.iter().copied().chain((0..n).map(|i| (i, i)))
}

/// Scales every row of `features` to sum 1, rows summing 0 are left untouched.
pub fn row_normalize(features: &mut Array2<f32>) {
    for mut row in features.axis_iter_mut(Axis(0)) {
        let sum = row.sum();
        if sum != 0. {
            row /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn path() -> Links {
        [(0, 1), (1, 0), (1, 2), (2, 1)].into_iter().collect()
    }

    #[test]
    fn aug_norm_adj_is_symmetric_and_scaled_by_degrees() {
        let adj = Normalization::AugNormAdj.adjacency(&path(), 3).unwrap();

        // Augmented degrees are [2, 3, 2].
        assert!((adj.get(0, 0) - 0.5).abs() < 1e-6);
        assert!((adj.get(1, 1) - 1. / 3.).abs() < 1e-6);
        assert!((adj.get(0, 1) - 1. / 6f32.sqrt()).abs() < 1e-6);
        assert_eq!(adj.get(0, 1), adj.get(1, 0));
        assert_eq!(adj.get(0, 2), 0.);
    }

    #[test]
    fn a_tilde_rows_sum_to_one() {
        let a_tilde = row_normalized_with_loops(&path(), 4).unwrap();

        // Node 3 is isolated and keeps only its self loop.
        for sum in a_tilde.row_sums() {
            assert!((sum - 1.).abs() < 1e-6);
        }
        assert_eq!(a_tilde.get(3, 3), 1.);
    }

    #[test]
    fn features_are_row_normalized() {
        let mut features = array![[1., 3.], [0., 0.], [2., 2.]];
        row_normalize(&mut features);

        assert_eq!(features, array![[0.25, 0.75], [0., 0.], [0.5, 0.5]]);
    }
}
