use std::sync::Arc;

use ndarray::{Array2, ArrayView2};

use super::CsrMatrix;
use crate::{MlErr, Result};

/// A linear operator over the nodes of a graph.
///
/// Layers only need to apply a kernel and its transpose (for the backward pass), so every
/// graph kernel of the model hides behind this trait, whether it's stored as a sparse matrix
/// or evaluated lazily as a polynomial of one.
pub trait GraphOperator {
    /// Returns the amount of nodes this operator acts upon.
    fn dim(&self) -> usize;

    /// Computes `K · x`.
    fn apply(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Computes `Kᵀ · x`.
    fn apply_transpose(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;
}

impl<T: GraphOperator + ?Sized> GraphOperator for &T {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn apply(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        (**self).apply(x)
    }

    fn apply_transpose(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        (**self).apply_transpose(x)
    }
}

/// A square sparse matrix paired with its transpose.
///
/// Cloning is cheap, both matrices are reference counted.
#[derive(Debug, Clone)]
pub struct SparseOperator {
    matrix: Arc<CsrMatrix>,
    adjoint: Arc<CsrMatrix>,
}

impl SparseOperator {
    /// Creates a new `SparseOperator`.
    ///
    /// # Arguments
    /// * `matrix` - A square sparse matrix.
    ///
    /// # Returns
    /// A new `SparseOperator` or an error if `matrix` isn't square.
    pub fn new(matrix: CsrMatrix) -> Result<Self> {
        let (rows, cols) = matrix.shape();
        if rows != cols {
            return Err(MlErr::ShapeMismatch {
                what: "graph operator",
                got: (rows, cols),
                expected: (rows, rows),
            });
        }

        let adjoint = matrix.transpose();

        Ok(Self {
            matrix: Arc::new(matrix),
            adjoint: Arc::new(adjoint),
        })
    }

    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }
}

impl GraphOperator for SparseOperator {
    fn dim(&self) -> usize {
        self.matrix.shape().0
    }

    fn apply(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.matrix.mul_dense(x)
    }

    fn apply_transpose(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.adjoint.mul_dense(x)
    }
}

/// The `power`-th power of a sparse operator, evaluated as repeated products.
#[derive(Debug, Clone, Copy)]
pub struct MatrixPower<'a> {
    base: &'a SparseOperator,
    power: u32,
}

impl<'a> MatrixPower<'a> {
    pub fn new(base: &'a SparseOperator, power: u32) -> Self {
        Self { base, power }
    }
}

impl GraphOperator for MatrixPower<'_> {
    fn dim(&self) -> usize {
        self.base.dim()
    }

    fn apply(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut out = x.to_owned();
        for _ in 0..self.power {
            out = self.base.apply(out.view())?;
        }

        Ok(out)
    }

    fn apply_transpose(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut out = x.to_owned();
        for _ in 0..self.power {
            out = self.base.apply_transpose(out.view())?;
        }

        Ok(out)
    }
}

/// The largest dyadic scale whose walk powers fit in a `u32`.
pub const MAX_WAVELET_SCALE: u32 = u32::BITS - 1;

/// A polynomial `Σ cₖ Pᵏ` of a walk matrix `P`.
///
/// Scattering wavelets are differences of dyadic powers of the lazy random walk, which are
/// dense once materialized; keeping them as polynomials only costs sparse products.
#[derive(Debug, Clone)]
pub struct WalkPolynomial {
    walk: SparseOperator,
    terms: Vec<(u32, f32)>,
}

impl WalkPolynomial {
    /// Creates a new `WalkPolynomial`.
    ///
    /// # Arguments
    /// * `walk` - The matrix the polynomial is evaluated on.
    /// * `terms` - Pairs of `(power, coefficient)`.
    pub fn new(walk: SparseOperator, mut terms: Vec<(u32, f32)>) -> Self {
        terms.sort_by_key(|&(power, _)| power);
        Self { walk, terms }
    }

    /// Creates the scattering wavelet `Ψₖ = P^(2^(k-1)) - P^(2^k)`.
    ///
    /// # Arguments
    /// * `walk` - The lazy random walk matrix `P`.
    /// * `scale` - The dyadic scale `k`, starting at 1.
    ///
    /// # Returns
    /// The wavelet or an error if `scale` is zero or `2^k` overflows a `u32` power.
    pub fn wavelet(walk: SparseOperator, scale: u32) -> Result<Self> {
        let powers = scale
            .checked_sub(1)
            .and_then(|shift| 1u32.checked_shl(shift))
            .and_then(|low| Some((low, low.checked_mul(2)?)));

        let Some((low, high)) = powers else {
            return Err(MlErr::InvalidConfig(format!(
                "wavelet scale must be within [1, {MAX_WAVELET_SCALE}], got {scale}"
            )));
        };

        Ok(Self::new(walk, vec![(low, 1.), (high, -1.)]))
    }

    pub fn terms(&self) -> &[(u32, f32)] {
        &self.terms
    }

    fn evaluate<F>(&self, x: ArrayView2<f32>, step: F) -> Result<Array2<f32>>
    where
        F: Fn(ArrayView2<f32>) -> Result<Array2<f32>>,
    {
        let mut acc = Array2::zeros(x.dim());
        let mut current = x.to_owned();
        let mut power = 0;

        for &(target, coeff) in &self.terms {
            while power < target {
                current = step(current.view())?;
                power += 1;
            }

            acc.scaled_add(coeff, &current);
        }

        Ok(acc)
    }
}

impl GraphOperator for WalkPolynomial {
    fn dim(&self) -> usize {
        self.walk.dim()
    }

    fn apply(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.evaluate(x, |v| self.walk.apply(v))
    }

    fn apply_transpose(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.evaluate(x, |v| self.walk.apply_transpose(v))
    }
}

/// The residual smoothing kernel `(I + α Ã) / (1 + α)`.
#[derive(Debug, Clone, Copy)]
pub struct ResidualOperator<'a> {
    a_tilde: &'a SparseOperator,
    alpha: f32,
}

impl<'a> ResidualOperator<'a> {
    pub fn new(a_tilde: &'a SparseOperator, alpha: f32) -> Self {
        Self { a_tilde, alpha }
    }

    fn blend(&self, x: ArrayView2<f32>, smoothed: Array2<f32>) -> Array2<f32> {
        let norm = 1. / (1. + self.alpha);
        let mut out = smoothed * (self.alpha * norm);
        out.scaled_add(norm, &x);
        out
    }
}

impl GraphOperator for ResidualOperator<'_> {
    fn dim(&self) -> usize {
        self.a_tilde.dim()
    }

    fn apply(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let smoothed = self.a_tilde.apply(x)?;
        Ok(self.blend(x, smoothed))
    }

    fn apply_transpose(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let smoothed = self.a_tilde.apply_transpose(x)?;
        Ok(self.blend(x, smoothed))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn walk() -> SparseOperator {
        // Column stochastic walk over a path of 3 nodes.
        let m = CsrMatrix::from_triplets(
            (3, 3),
            [
                (0, 0, 0.5),
                (1, 0, 0.5),
                (0, 1, 0.25),
                (1, 1, 0.5),
                (2, 1, 0.25),
                (1, 2, 0.5),
                (2, 2, 0.5),
            ],
        )
        .unwrap();

        SparseOperator::new(m).unwrap()
    }

    fn dense(op: &SparseOperator) -> Array2<f32> {
        op.apply(Array2::eye(op.dim()).view()).unwrap()
    }

    #[test]
    fn non_square_operators_fail() {
        let m = CsrMatrix::from_triplets((2, 3), []).unwrap();
        assert!(SparseOperator::new(m).is_err());
    }

    #[test]
    fn matrix_power() {
        let p = walk();
        let pd = dense(&p);
        let x = array![[1., 0.], [0., 1.], [2., -1.]];

        let expected = pd.dot(&pd).dot(&pd).dot(&x);
        let got = MatrixPower::new(&p, 3).apply(x.view()).unwrap();
        assert!((got - expected).iter().all(|d| d.abs() < 1e-6));

        let expected_t = pd.t().dot(&pd.t()).dot(&x);
        let got_t = MatrixPower::new(&p, 2).apply_transpose(x.view()).unwrap();
        assert!((got_t - expected_t).iter().all(|d| d.abs() < 1e-6));
    }

    #[test]
    fn wavelet_terms() {
        let wavelet = |scale| WalkPolynomial::wavelet(walk(), scale).unwrap();

        assert_eq!(wavelet(1).terms(), [(1, 1.), (2, -1.)]);
        assert_eq!(wavelet(3).terms(), [(4, 1.), (8, -1.)]);
        assert_eq!(wavelet(MAX_WAVELET_SCALE).terms(), [(1 << 30, 1.), (1 << 31, -1.)]);
    }

    #[test]
    fn out_of_range_wavelet_scales_fail() {
        for scale in [0, MAX_WAVELET_SCALE + 1, u32::MAX] {
            assert!(matches!(
                WalkPolynomial::wavelet(walk(), scale),
                Err(MlErr::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn wavelet_matches_dense_evaluation() {
        let p = walk();
        let pd = dense(&p);
        let x = array![[1.], [2.], [3.]];

        let p2 = pd.dot(&pd);
        let p4 = p2.dot(&p2);
        let expected = (&p2 - &p4).dot(&x);
        let got = WalkPolynomial::wavelet(p, 2).unwrap().apply(x.view()).unwrap();

        assert!((got - expected).iter().all(|d| d.abs() < 1e-6));
    }

    #[test]
    fn wavelets_annihilate_the_stationary_direction() {
        // P is column stochastic so 1ᵀ P = 1ᵀ, hence 1ᵀ Ψ = 0.
        let psi = WalkPolynomial::wavelet(walk(), 1).unwrap();
        let ones = Array2::ones((3, 1));
        let got = psi.apply_transpose(ones.view()).unwrap();

        assert!(got.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn residual_operator_blends_identity_and_smoothing() {
        let a = walk();
        let x = array![[1.], [0.], [0.]];
        let got = ResidualOperator::new(&a, 1.).apply(x.view()).unwrap();

        // (x + Ã x) / 2 with Ã x = [0.5, 0.5, 0].
        assert_eq!(got, array![[0.75], [0.25], [0.]]);

        let identity = ResidualOperator::new(&a, 0.).apply(x.view()).unwrap();
        assert_eq!(identity, x);
    }
}
