use std::{cell::RefCell, rc::Rc};

use log::info;
use rand::{SeedableRng, rngs::StdRng};

use super::{OptimizerKind, Session, Trainer, TrainingConfig};
use crate::{
    MlErr, Result,
    arch::{Model, ModelConfig, ScatteringGcn, loss::NllLoss},
    dataset::GraphDataset,
    optimization::{Adam, GradientDescent, Optimizer},
};

/// Builds `Trainer`s from a model and a training configuration.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Trainer` with freshly initialized parameters.
    ///
    /// # Arguments
    /// * `model` - The sizing of the model.
    /// * `training` - The training hyperparameters.
    /// * `dataset` - The dataset the model will be trained with.
    ///
    /// # Returns
    /// A ready to run `Trainer` or an error if the configs don't fit the dataset.
    pub fn build(
        &self,
        model: &ModelConfig,
        training: &TrainingConfig,
        dataset: GraphDataset,
    ) -> Result<Box<dyn Trainer>> {
        training.validate()?;
        self.check_fits(model, &dataset)?;

        let model = ScatteringGcn::new(model)?;
        let rng = Rc::new(RefCell::new(self.generate_rng(training.seed)));
        let params = model.init_params(rng.clone())?;

        // Every generator sharing the rng is dropped by now.
        let rng = Rc::try_unwrap(rng)
            .map_err(|_| MlErr::InvalidConfig("the initialization rng is still shared".into()))?
            .into_inner();

        info!(
            "model has {} parameters in {} tensors",
            model.size(),
            model.tensors().len()
        );

        self.resolve_optimizer(training, model, dataset, params, rng)
    }

    fn check_fits(&self, model: &ModelConfig, dataset: &GraphDataset) -> Result<()> {
        let features = dataset.inputs().num_features();
        if model.nfeat != features {
            return Err(MlErr::SizeMismatch {
                what: "model input features",
                got: model.nfeat,
                expected: features,
            });
        }

        if model.nclass < dataset.num_classes() {
            return Err(MlErr::SizeMismatch {
                what: "model output classes",
                got: model.nclass,
                expected: dataset.num_classes(),
            });
        }

        Ok(())
    }

    fn resolve_optimizer<M>(
        &self,
        training: &TrainingConfig,
        model: M,
        dataset: GraphDataset,
        params: Vec<f32>,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
    {
        let TrainingConfig {
            learning_rate: lr,
            weight_decay: wd,
            ..
        } = *training;

        match training.optimizer {
            OptimizerKind::Adam => {
                let optimizer = Adam::new(model.size(), lr, wd);
                self.terminate_build(training, model, optimizer, dataset, params, rng)
            }
            OptimizerKind::Sgd => {
                let optimizer = GradientDescent::new(lr, wd);
                self.terminate_build(training, model, optimizer, dataset, params, rng)
            }
        }
    }

    fn terminate_build<M, O>(
        &self,
        training: &TrainingConfig,
        model: M,
        optimizer: O,
        dataset: GraphDataset,
        params: Vec<f32>,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
    {
        let session = Session::new(
            model,
            optimizer,
            NllLoss::new(),
            dataset,
            training.clone(),
            params,
            rng,
        )?;

        Ok(Box::new(session))
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arch::Selector, test::toy_dataset};

    fn model_config() -> ModelConfig {
        ModelConfig {
            nfeat: 2,
            hid1: 4,
            hid2: 3,
            nclass: 2,
            dropout: 0.3,
            smoo: 1.,
            selectors: [Selector::new(1, 0), Selector::new(2, 1)],
        }
    }

    fn run(training: &TrainingConfig) -> (Vec<f32>, Vec<f32>) {
        let mut trainer = TrainerBuilder::new()
            .build(&model_config(), training, toy_dataset(2))
            .unwrap();

        trainer.train().unwrap();
        (trainer.params().to_vec(), trainer.history().val_loss().to_vec())
    }

    #[test]
    fn seeded_builds_are_deterministic() {
        for optimizer in [OptimizerKind::Adam, OptimizerKind::Sgd] {
            let training = TrainingConfig {
                epochs: 3,
                optimizer,
                ..Default::default()
            };

            assert_eq!(run(&training), run(&training));
        }
    }

    #[test]
    fn feature_mismatch_fails() {
        let mut config = model_config();
        config.nfeat = 3;

        let res = TrainerBuilder::new().build(&config, &TrainingConfig::default(), toy_dataset(2));
        assert!(matches!(res, Err(MlErr::SizeMismatch { .. })));
    }

    #[test]
    fn too_few_classes_fail() {
        let mut config = model_config();
        config.nclass = 1;

        let res = TrainerBuilder::new().build(&config, &TrainingConfig::default(), toy_dataset(2));
        assert!(res.is_err());
    }
}
