use std::time::Duration;

use serde::Serialize;

/// What happened during a single training epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// The training loss, L1 penalty included.
    pub loss_train: f32,
    pub acc_train: f64,
    pub loss_val: f32,
    pub acc_val: f64,
    /// The learning rate the update of this epoch was taken with.
    pub learning_rate: f32,
    pub epoch_time: Duration,
    /// Time since the first epoch started.
    pub elapsed: Duration,
}

/// Loss and accuracy over an index set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalStats {
    pub loss: f32,
    pub accuracy: f64,
}

/// The per epoch metric traces of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
    val_accuracy: Vec<f64>,
    elapsed: Vec<f64>,
    train_loss: Vec<f32>,
    val_loss: Vec<f32>,
}

impl History {
    pub fn with_capacity(epochs: usize) -> Self {
        Self {
            val_accuracy: Vec::with_capacity(epochs),
            elapsed: Vec::with_capacity(epochs),
            train_loss: Vec::with_capacity(epochs),
            val_loss: Vec::with_capacity(epochs),
        }
    }

    pub fn push(&mut self, stats: &EpochStats) {
        self.val_accuracy.push(stats.acc_val);
        self.elapsed.push(stats.elapsed.as_secs_f64());
        self.train_loss.push(stats.loss_train);
        self.val_loss.push(stats.loss_val);
    }

    pub fn len(&self) -> usize {
        self.val_accuracy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.val_accuracy.is_empty()
    }

    pub fn val_accuracy(&self) -> &[f64] {
        &self.val_accuracy
    }

    /// Seconds since training started, at the end of each epoch.
    pub fn elapsed(&self) -> &[f64] {
        &self.elapsed
    }

    pub fn train_loss(&self) -> &[f32] {
        &self.train_loss
    }

    pub fn val_loss(&self) -> &[f32] {
        &self.val_loss
    }
}
