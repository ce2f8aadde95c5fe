use std::time::Instant;

use log::{debug, info};
use ndarray::Array2;
use rand::Rng;

use super::{
    EarlyStopping, EpochStats, EvalStats, History, Trainer, TrainingConfig, add_l1_grad,
    l1_penalty,
};
use crate::{
    MlErr, Result,
    arch::{
        Mode, Model, ParamTensor,
        loss::{LossFn, accuracy},
    },
    dataset::GraphDataset,
    optimization::Optimizer,
};

/// A full batch node classification training session.
///
/// Owns the model, its flat parameter and gradient buffers, the optimizer and the metric
/// history, and runs the epochs one at a time.
pub struct Session<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: M,
    optimizer: O,
    loss_fn: L,
    dataset: GraphDataset,
    config: TrainingConfig,
    rng: R,

    params: Vec<f32>,
    grad: Vec<f32>,
    history: History,
    early_stopping: Option<EarlyStopping>,

    epoch: usize,
    stopped_early: bool,
    started: Option<Instant>,
}

impl<M, O, L, R> Session<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Creates a new `Session`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer, already holding the base learning rate.
    /// * `loss_fn` - The loss minimized over the training nodes.
    /// * `dataset` - The graph, labels and split.
    /// * `config` - The training hyperparameters.
    /// * `params` - The initial parameters.
    /// * `rng` - The source of randomness for dropout.
    ///
    /// # Returns
    /// A new `Session` or an error if the config is invalid or `params` doesn't fit the model.
    pub fn new(
        model: M,
        optimizer: O,
        loss_fn: L,
        dataset: GraphDataset,
        config: TrainingConfig,
        params: Vec<f32>,
        rng: R,
    ) -> Result<Self> {
        config.validate()?;

        if params.len() != model.size() {
            return Err(MlErr::SizeMismatch {
                what: "initial parameters",
                got: params.len(),
                expected: model.size(),
            });
        }

        Ok(Self {
            grad: vec![0.; params.len()],
            history: History::with_capacity(config.epochs),
            early_stopping: config.patience.map(EarlyStopping::new),
            model,
            optimizer,
            loss_fn,
            dataset,
            config,
            rng,
            params,
            epoch: 0,
            stopped_early: false,
            started: None,
        })
    }

    pub fn dataset(&self) -> &GraphDataset {
        &self.dataset
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Returns the amount of epochs run so far.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    fn evaluate(&self, output: &Array2<f32>, mask: &[usize]) -> Result<EvalStats> {
        let labels = self.dataset.labels();

        Ok(EvalStats {
            loss: self.loss_fn.loss(output.view(), labels, mask)?,
            accuracy: accuracy(output.view(), labels, mask)?,
        })
    }

    fn check_finite(&self, what: &'static str, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(MlErr::NonFinite {
                what,
                epoch: self.epoch + 1,
            });
        }

        Ok(())
    }

    fn run_epoch(&mut self) -> Result<EpochStats> {
        let epoch_start = Instant::now();
        let started = *self.started.get_or_insert(epoch_start);
        let inputs = self.dataset.inputs();
        let labels = self.dataset.labels();
        let split = self.dataset.split();

        let output = self
            .model
            .forward(&self.params, inputs, Mode::Train, &mut self.rng)?;

        let train = self.evaluate(&output, split.train())?;
        let penalty = l1_penalty(&self.params, self.model.tensors(), self.config.l1_mode);
        let loss_train = train.loss + self.config.l1 * penalty;
        self.check_finite("training loss", loss_train)?;

        let d = self.loss_fn.loss_prime(output.view(), labels, split.train())?;
        self.model
            .backward(&self.params, &mut self.grad, inputs, d.view())?;
        add_l1_grad(
            &self.params,
            &mut self.grad,
            self.model.tensors(),
            self.config.l1_mode,
            self.config.l1,
        );

        let learning_rate = self.optimizer.learning_rate();
        self.optimizer.update_params(&self.grad, &mut self.params)?;

        // Fast mode validates on the dropout perturbed output of the training pass.
        let output = if self.config.fastmode {
            output
        } else {
            self.model
                .forward(&self.params, inputs, Mode::Eval, &mut self.rng)?
        };

        let val = self.evaluate(&output, split.val())?;
        self.check_finite("validation loss", val.loss)?;

        self.epoch += 1;
        let schedule = &self.config.schedule;
        if schedule.changes_at(self.epoch) {
            let lr = schedule.learning_rate(self.config.learning_rate, self.epoch);
            debug!("learning rate decayed to {lr} after epoch {}", self.epoch);
            self.optimizer.set_learning_rate(lr);
        }

        let now = Instant::now();
        Ok(EpochStats {
            epoch: self.epoch,
            loss_train,
            acc_train: train.accuracy,
            loss_val: val.loss,
            acc_val: val.accuracy,
            learning_rate,
            epoch_time: now - epoch_start,
            elapsed: now - started,
        })
    }

    fn log_epoch(&self, stats: &EpochStats) {
        let level = if self.config.log_every_epoch {
            log::Level::Info
        } else {
            log::Level::Debug
        };

        log::log!(level, "{}", epoch_line(stats, self.config.epoch_tag.as_deref()));
    }
}

fn epoch_line(stats: &EpochStats, tag: Option<&str>) -> String {
    let EpochStats {
        epoch,
        loss_train,
        acc_train,
        loss_val,
        acc_val,
        epoch_time,
        ..
    } = *stats;

    let tag = tag.map(|tag| format!(" {tag}")).unwrap_or_default();
    format!(
        "Epoch: {epoch:04}{tag} loss_train: {loss_train:.4} acc_train: {acc_train:.4} \
         loss_val: {loss_val:.4} acc_val: {acc_val:.4} time: {:.4}s",
        epoch_time.as_secs_f32()
    )
}

impl<M, O, L, R> Trainer for Session<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    fn step(&mut self) -> Result<Option<EpochStats>> {
        if self.finished() {
            return Ok(None);
        }

        let stats = self.run_epoch()?;
        self.log_epoch(&stats);
        self.history.push(&stats);

        if let Some(stopping) = self.early_stopping.as_mut()
            && stopping.observe(1. - stats.acc_val)
        {
            info!("Early stopping after epoch {}", stats.epoch);
            self.stopped_early = true;
        }

        Ok(Some(stats))
    }

    fn finished(&self) -> bool {
        self.stopped_early || self.epoch >= self.config.epochs
    }

    fn test(&mut self) -> Result<EvalStats> {
        let output = self.model.forward(
            &self.params,
            self.dataset.inputs(),
            Mode::Eval,
            &mut self.rng,
        )?;

        self.evaluate(&output, self.dataset.split().test())
    }

    fn history(&self) -> &History {
        &self.history
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn tensors(&self) -> &[ParamTensor] {
        self.model.tensors()
    }

    fn stopped_early(&self) -> bool {
        self.stopped_early
    }
}
