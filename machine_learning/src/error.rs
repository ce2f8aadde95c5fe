use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    ShapeMismatch {
        what: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },
    InvalidSelector {
        index: usize,
        available: usize,
    },
    EmptyMask {
        what: &'static str,
    },
    InvalidSplit(String),
    InvalidConfig(String),
    NonFinite {
        what: &'static str,
        epoch: usize,
    },
    MissingForward {
        layer: &'static str,
    },
    Shape(ShapeError),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a shape mismatch in {what}, got {got:?} and expected {expected:?}"
            ),
            MlErr::IndexOutOfBounds { what, index, len } => {
                write!(f, "The {what} index {index} is out of bounds for length {len}")
            }
            MlErr::InvalidSelector { index, available } => write!(
                f,
                "The scattering index {index} is invalid, only {available} wavelets were loaded"
            ),
            MlErr::EmptyMask { what } => {
                write!(f, "Tried to evaluate over an empty {what} index set")
            }
            MlErr::InvalidSplit(msg) => write!(f, "invalid split: {msg}"),
            MlErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            MlErr::NonFinite { what, epoch } => {
                write!(f, "The {what} became non finite at epoch {epoch}")
            }
            MlErr::MissingForward { layer } => {
                write!(f, "Tried to backpropagate through {layer} before a forward pass")
            }
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}
