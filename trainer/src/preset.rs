use std::path::PathBuf;

use citation::{LoadOptions, Normalization, SplitSizes};
use clap::ValueEnum;
use machine_learning::{
    arch::Selector,
    optimization::LrSchedule,
    sparse::Backend,
    training::{L1Mode, OptimizerKind, TrainingConfig},
};
use serde::Serialize;

use crate::{ModelParams, RunConfig};

const DATA_DIR: &str = "data";
const SEED: u64 = 42;

/// The two stock setups every option defaults to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Long run with milestone decay, saves the accuracy and time traces.
    #[default]
    Pubmed,
    /// Short run with interval decay and per epoch progress.
    Cora,
}

impl Preset {
    /// Returns this preset's run configuration.
    pub fn run_config(self) -> RunConfig {
        match self {
            Preset::Pubmed => pubmed(),
            Preset::Cora => cora(),
        }
    }
}

fn load_options(wavelets: u32) -> LoadOptions {
    LoadOptions {
        normalization: Normalization::AugNormAdj,
        backend: Backend::Rayon,
        wavelets,
        split: SplitSizes::default(),
    }
}

fn pubmed() -> RunConfig {
    RunConfig {
        preset: Preset::Pubmed,
        dataset: "pubmed".into(),
        data_dir: PathBuf::from(DATA_DIR),
        load: load_options(5),
        model: ModelParams {
            hid1: 13,
            hid2: 14,
            dropout: 0.7,
            smoo: 1.,
            selectors: [Selector::new(1, 0), Selector::new(1, 1)],
        },
        training: TrainingConfig {
            seed: Some(SEED),
            epochs: 1000,
            learning_rate: 0.01,
            weight_decay: 5e-4,
            l1: 0.,
            l1_mode: L1Mode::LastTensor,
            fastmode: false,
            schedule: LrSchedule::MultiStep {
                milestones: (100..=900).step_by(100).collect(),
                gamma: 0.9,
            },
            optimizer: OptimizerKind::Adam,
            patience: None,
            log_every_epoch: false,
            epoch_tag: None,
        },
        trace_dir: Some(PathBuf::from(".")),
        summary: None,
    }
}

fn cora() -> RunConfig {
    RunConfig {
        preset: Preset::Cora,
        dataset: "cora".into(),
        data_dir: PathBuf::from(DATA_DIR),
        // The default second selector reads the fourth wavelet.
        load: load_options(4),
        model: ModelParams {
            hid1: 13,
            hid2: 25,
            dropout: 0.9,
            smoo: 0.5,
            selectors: [Selector::new(1, 1), Selector::new(1, 3)],
        },
        training: TrainingConfig {
            seed: Some(SEED),
            epochs: 200,
            learning_rate: 0.005,
            weight_decay: 0.,
            l1: 0.05,
            l1_mode: L1Mode::LastTensor,
            fastmode: false,
            schedule: LrSchedule::Step {
                step_size: 50,
                gamma: 0.9,
            },
            optimizer: OptimizerKind::Adam,
            patience: None,
            log_every_epoch: true,
            epoch_tag: None,
        },
        trace_dir: None,
        summary: None,
    }
}
