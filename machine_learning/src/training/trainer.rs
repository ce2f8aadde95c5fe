use super::{EpochStats, EvalStats, History};
use crate::{Result, arch::ParamTensor};

/// A training session as seen from the outside, independent of its model and optimizer.
pub trait Trainer {
    /// Runs one epoch.
    ///
    /// # Returns
    /// The epoch's stats, or `None` if the session already finished.
    fn step(&mut self) -> Result<Option<EpochStats>>;

    /// Whether every epoch ran or early stopping triggered.
    fn finished(&self) -> bool;

    /// Evaluates the current parameters on the test nodes.
    fn test(&mut self) -> Result<EvalStats>;

    fn history(&self) -> &History;

    fn params(&self) -> &[f32];

    fn tensors(&self) -> &[ParamTensor];

    /// Whether the session ended before its last epoch.
    fn stopped_early(&self) -> bool;

    /// Runs every remaining epoch.
    fn train(&mut self) -> Result<&History> {
        while self.step()?.is_some() {}
        Ok(self.history())
    }
}
