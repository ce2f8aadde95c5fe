use serde::Serialize;

use crate::{MlErr, Result};

/// A learning rate schedule, stepped once per epoch after the optimizer update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LrSchedule {
    Constant,
    /// Decays by `gamma` every `step_size` steps.
    Step { step_size: usize, gamma: f32 },
    /// Decays by `gamma` once each milestone is reached.
    MultiStep { milestones: Vec<usize>, gamma: f32 },
}

impl LrSchedule {
    /// Checks the schedule can be stepped.
    ///
    /// # Returns
    /// An error if the step size is zero or the milestones aren't strictly increasing.
    pub fn validate(&self) -> Result<()> {
        match self {
            LrSchedule::Constant => Ok(()),
            LrSchedule::Step { step_size: 0, .. } => Err(MlErr::InvalidConfig(
                "the schedule step size must be positive".into(),
            )),
            LrSchedule::Step { .. } => Ok(()),
            LrSchedule::MultiStep { milestones, .. } => {
                if milestones.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(MlErr::InvalidConfig(format!(
                        "milestones must be strictly increasing, got {milestones:?}"
                    )));
                }

                Ok(())
            }
        }
    }

    /// Returns the factor the base learning rate is multiplied by after `steps` steps.
    pub fn factor(&self, steps: usize) -> f32 {
        let decays = match self {
            LrSchedule::Constant => 0,
            LrSchedule::Step { step_size, .. } => steps / (*step_size).max(1),
            LrSchedule::MultiStep { milestones, .. } => {
                milestones.iter().filter(|&&m| m <= steps).count()
            }
        };

        match self {
            LrSchedule::Constant => 1.,
            LrSchedule::Step { gamma, .. } | LrSchedule::MultiStep { gamma, .. } => {
                gamma.powi(decays as i32)
            }
        }
    }

    pub fn learning_rate(&self, base: f32, steps: usize) -> f32 {
        base * self.factor(steps)
    }

    /// Whether the learning rate differs between `steps - 1` and `steps` steps.
    pub fn changes_at(&self, steps: usize) -> bool {
        match self {
            LrSchedule::Constant => false,
            LrSchedule::Step { step_size, .. } => steps > 0 && steps % (*step_size).max(1) == 0,
            LrSchedule::MultiStep { milestones, .. } => milestones.contains(&steps),
        }
    }
}
