mod csr;
mod operator;

pub use csr::{Backend, CsrMatrix};
pub use operator::{
    GraphOperator, MAX_WAVELET_SCALE, MatrixPower, ResidualOperator, SparseOperator,
    WalkPolynomial,
};
