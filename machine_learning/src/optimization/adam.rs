use super::{Optimizer, check_sizes};
use crate::Result;

pub const DEFAULT_BETA1: f32 = 0.9;
pub const DEFAULT_BETA2: f32 = 0.999;
pub const DEFAULT_EPSILON: f32 = 1e-8;

/// The Adam optimizer with L2 weight decay folded into the gradient.
///
/// The bias corrected second moment is used for the denominator before adding `epsilon`.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    weight_decay: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    m: Box<[f32]>,
    v: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer with the default moment coefficients.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold state for.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `weight_decay` - The L2 coefficient added to the gradient as `weight_decay · p`.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, weight_decay: f32) -> Self {
        Self::with_betas(
            len,
            learning_rate,
            weight_decay,
            (DEFAULT_BETA1, DEFAULT_BETA2),
            DEFAULT_EPSILON,
        )
    }

    pub fn with_betas(
        len: usize,
        learning_rate: f32,
        weight_decay: f32,
        (beta1, beta2): (f32, f32),
        epsilon: f32,
    ) -> Self {
        Self {
            learning_rate,
            weight_decay,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;
        check_sizes(&self.m, params)?;

        let Self {
            learning_rate: lr,
            weight_decay: wd,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let step_size = lr / (1. - self.beta1_t);
        let bc2_sqrt = (1. - self.beta2_t).sqrt();

        params
            .iter_mut()
            .zip(grad)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
            .for_each(|(((p, &g), m), v)| {
                let g = g + wd * *p;
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g * g;
                *p -= step_size * *m / (v.sqrt() / bc2_sqrt + eps);
            });

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}
