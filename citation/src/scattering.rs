use machine_learning::{
    Result,
    sparse::{CsrMatrix, SparseOperator, WalkPolynomial},
};

use crate::normalization::Links;

/// Builds the lazy random walk `P = ½ (I + A D^-1)`.
///
/// `P` is column stochastic except on isolated nodes, whose inverse degree is taken as 0.
pub fn lazy_walk(links: &Links, n: usize) -> Result<CsrMatrix> {
    let mut degrees = vec![0.; n];
    for &(u, _) in links {
        degrees[u] += 1.;
    }

    let entries = links
        .iter()
        .map(|&(u, v)| (u, v, 0.5 / degrees[v]))
        .chain((0..n).map(|i| (i, i, 0.5)));

    CsrMatrix::from_triplets((n, n), entries)
}

/// Builds the first `count` scattering wavelets `Ψ_k = P^(2^(k-1)) - P^(2^k)` of `walk`.
///
/// # Returns
/// The wavelets or an error if `count` exceeds `MAX_WAVELET_SCALE`.
pub fn wavelets(walk: CsrMatrix, count: u32) -> Result<Vec<WalkPolynomial>> {
    let walk = SparseOperator::new(walk)?;
    (1..=count)
        .map(|scale| WalkPolynomial::wavelet(walk.clone(), scale))
        .collect()
}

#[cfg(test)]
mod tests {
    use machine_learning::{
        MlErr,
        sparse::{GraphOperator, MAX_WAVELET_SCALE},
    };
    use ndarray::Array2;

    use super::*;

    fn star() -> Links {
        [(0, 1), (1, 0), (0, 2), (2, 0), (0, 3), (3, 0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn walk_columns_are_stochastic() {
        let walk = lazy_walk(&star(), 4).unwrap();
        let sums = walk.transpose().row_sums();

        assert!(sums.iter().all(|s| (s - 1.).abs() < 1e-6), "{sums:?}");
        assert_eq!(walk.get(1, 0), 0.5 / 3.);
        assert_eq!(walk.get(0, 1), 0.5);
    }

    #[test]
    fn isolated_nodes_only_keep_the_lazy_half() {
        let walk = lazy_walk(&star(), 5).unwrap();
        assert_eq!(walk.get(4, 4), 0.5);
        assert_eq!(walk.row(4).count(), 1);
    }

    #[test]
    fn builds_dyadic_wavelets() {
        let walk = lazy_walk(&star(), 4).unwrap();
        let psi = wavelets(walk, 3).unwrap();

        assert_eq!(psi.len(), 3);
        assert_eq!(psi[2].terms(), [(4, 1.), (8, -1.)]);

        let ones = Array2::ones((4, 1));
        let got = psi[1].apply_transpose(ones.view()).unwrap();
        assert!(got.iter().all(|v| v.abs() < 1e-5));
    }

    #[test]
    fn too_many_wavelets_fail() {
        let walk = lazy_walk(&star(), 4).unwrap();
        assert!(wavelets(walk.clone(), MAX_WAVELET_SCALE).is_ok());
        assert!(matches!(wavelets(walk, 32), Err(MlErr::InvalidConfig(_))));
    }
}
