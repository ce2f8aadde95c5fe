use super::{Optimizer, check_sizes};
use crate::Result;

/// Plain gradient descent with L2 weight decay.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f32,
    weight_decay: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The length of the steps taken on `update_params`.
    /// * `weight_decay` - The L2 coefficient added to the gradient as `weight_decay · p`.
    pub fn new(learning_rate: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            weight_decay,
        }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params)?;

        let Self {
            learning_rate: lr,
            weight_decay: wd,
        } = *self;

        for (p, g) in params.iter_mut().zip(grad) {
            *p -= lr * (g + wd * *p);
        }

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}
