use std::path::PathBuf;

use citation::LoadOptions;
use machine_learning::{
    arch::{ModelConfig, Selector},
    training::TrainingConfig,
};
use serde::Serialize;

use crate::Preset;

/// The model hyperparameters that don't depend on the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelParams {
    pub hid1: usize,
    pub hid2: usize,
    pub dropout: f32,
    pub smoo: f32,
    pub selectors: [Selector; 2],
}

impl ModelParams {
    /// Sizes the model for a dataset with `nfeat` features and `nclass` classes.
    pub fn config(&self, nfeat: usize, nclass: usize) -> ModelConfig {
        ModelConfig {
            nfeat,
            hid1: self.hid1,
            hid2: self.hid2,
            nclass,
            dropout: self.dropout,
            smoo: self.smoo,
            selectors: self.selectors,
        }
    }
}

/// Everything a training run needs, resolved from a preset and the command line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub preset: Preset,
    pub dataset: String,
    pub data_dir: PathBuf,
    pub load: LoadOptions,
    pub model: ModelParams,
    pub training: TrainingConfig,
    /// Where `sct_time.txt` and `sct_accu.txt` go, `None` skips them.
    pub trace_dir: Option<PathBuf>,
    /// Where the JSON run summary goes, if anywhere.
    pub summary: Option<PathBuf>,
}
