use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::ParamGen;
use crate::{MlErr, Result};

/// A parameter generator drawing from a probability distribution.
///
/// The random number generator is shared, so every tensor of a model can be drawn from the
/// same seeded stream in registration order.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: Rc<RefCell<R>>,
    distribution: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen`.
    ///
    /// # Arguments
    /// * `rng` - A shared random number generator.
    /// * `distribution` - The distribution to sample from.
    /// * `limit` - The maximum amount of values to generate.
    pub fn new(rng: Rc<RefCell<R>>, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Creates a new `RandParamGen` over `U(low, high)`.
    ///
    /// # Returns
    /// An error if the range is empty or not finite.
    pub fn uniform(rng: Rc<RefCell<R>>, limit: usize, low: f32, high: f32) -> Result<Self> {
        let distribution = Uniform::new(low, high)
            .map_err(|e| MlErr::InvalidConfig(format!("U({low}, {high}): {e}")))?;

        Ok(Self::new(rng, distribution, limit))
    }

    /// Creates a new `RandParamGen` over `U(-1/√fan_out, 1/√fan_out)`, the usual graph
    /// convolution initialization for both weights and biases.
    pub fn fan_out_uniform(rng: Rc<RefCell<R>>, limit: usize, fan_out: usize) -> Result<Self> {
        let stdv = 1. / (fan_out as f32).sqrt();
        Self::uniform(rng, limit, -stdv, stdv)
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;

        let mut rng = self.rng.borrow_mut();
        let sample = (0..n).map(|_| self.distribution.sample(&mut *rng)).collect();
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn seeded_rng() -> Rc<RefCell<StdRng>> {
        Rc::new(RefCell::new(StdRng::seed_from_u64(42)))
    }

    #[test]
    fn exhausts_after_limit() {
        let mut param_gen = RandParamGen::uniform(seeded_rng(), 10, -1., 1.).unwrap();

        assert_eq!(param_gen.sample(7).unwrap().len(), 7);
        assert_eq!(param_gen.sample(7).unwrap().len(), 3);
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn fan_out_uniform_is_bounded() {
        let mut param_gen = RandParamGen::fan_out_uniform(seeded_rng(), 1000, 16).unwrap();
        let sample = param_gen.sample(1000).unwrap();

        assert!(sample.iter().all(|v| (-0.25..0.25).contains(v)));
    }

    #[test]
    fn empty_range_fails() {
        assert!(RandParamGen::uniform(seeded_rng(), 1, 1., 1.).is_err());
    }

    #[test]
    fn shared_rng_continues_the_stream() {
        let rng = seeded_rng();
        let mut first = RandParamGen::uniform(rng.clone(), 2, 0., 1.).unwrap();
        let mut second = RandParamGen::uniform(rng, 2, 0., 1.).unwrap();
        let mut both = first.sample(2).unwrap();
        both.extend(second.sample(2).unwrap());

        let mut single = RandParamGen::uniform(seeded_rng(), 4, 0., 1.).unwrap();
        assert_eq!(both, single.sample(4).unwrap());
    }
}
