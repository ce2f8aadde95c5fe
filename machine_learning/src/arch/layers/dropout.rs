use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::{Rng, distr::Bernoulli};

use crate::{MlErr, Result, arch::Mode};

/// Inverted dropout: kept activations are scaled by `1 / (1 - rate)` while training, and
/// the layer is the identity when evaluating.
#[derive(Clone, Debug)]
pub struct Dropout {
    rate: f32,

    // Forward metadata
    mask: Option<Array2<f32>>,
}

impl Dropout {
    /// Creates a new `Dropout` layer.
    ///
    /// # Arguments
    /// * `rate` - The probability of zeroing an activation, within `[0, 1]`.
    ///
    /// # Returns
    /// A new `Dropout` or an error if the rate is not a probability.
    pub fn new(rate: f32) -> Result<Self> {
        if !(0. ..=1.).contains(&rate) {
            return Err(MlErr::InvalidConfig(format!(
                "dropout rate must be within [0, 1], got {rate}"
            )));
        }

        Ok(Self { rate, mask: None })
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn forward<R>(&mut self, x: Array2<f32>, mode: Mode, rng: &mut R) -> Result<Array2<f32>>
    where
        R: Rng + ?Sized,
    {
        if mode == Mode::Eval || self.rate == 0. {
            self.mask = None;
            return Ok(x);
        }

        let keep = 1. - self.rate;
        let mask = if keep > 0. {
            let bernoulli = Bernoulli::new(keep as f64)
                .map_err(|e| MlErr::InvalidConfig(format!("dropout: {e}")))?;
            let scale = 1. / keep;

            Array2::<bool>::random_using(x.dim(), bernoulli, rng)
                .mapv(|kept| if kept { scale } else { 0. })
        } else {
            Array2::zeros(x.dim())
        };

        let out = x * &mask;
        self.mask = Some(mask);
        Ok(out)
    }

    pub fn backward(&mut self, d: Array2<f32>) -> Array2<f32> {
        match self.mask.take() {
            Some(mask) => d * mask,
            None => d,
        }
    }
}
