use std::path::PathBuf;

use citation::Normalization;
use clap::{ArgAction, Parser, ValueEnum};
use machine_learning::{
    sparse::Backend,
    training::{L1Mode, OptimizerKind},
};

use crate::{Preset, RunConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NormalizationArg {
    #[value(alias = "AugNormAdj")]
    AugNormAdj,
}

impl From<NormalizationArg> for Normalization {
    fn from(value: NormalizationArg) -> Self {
        match value {
            NormalizationArg::AugNormAdj => Normalization::AugNormAdj,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OptimizerArg {
    Adam,
    Sgd,
}

impl From<OptimizerArg> for OptimizerKind {
    fn from(value: OptimizerArg) -> Self {
        match value {
            OptimizerArg::Adam => OptimizerKind::Adam,
            OptimizerArg::Sgd => OptimizerKind::Sgd,
        }
    }
}

/// Train a scattering GCN on a citation network.
///
/// Every option falls back to the chosen preset's value.
#[derive(Parser, Debug)]
#[command(name = "sct-train", version, about, args_override_self = true)]
pub struct Args {
    /// The setup every unset option defaults to.
    #[arg(long, value_enum, default_value_t = Preset::Pubmed)]
    pub preset: Preset,

    /// Stem of the `.content` and `.cites` files.
    #[arg(long)]
    pub dataset: Option<String>,

    /// Directory holding the dataset files.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Runs the sparse products on a single thread.
    #[arg(long)]
    pub no_cuda: bool,

    /// Validate during the training pass.
    #[arg(long)]
    pub fastmode: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub epochs: Option<usize>,

    /// Initial learning rate.
    #[arg(long)]
    pub lr: Option<f32>,

    /// L2 penalty on the parameters.
    #[arg(long, alias = "weight_decay")]
    pub weight_decay: Option<f32>,

    /// L1 penalty coefficient.
    #[arg(long)]
    pub l1: Option<f32>,

    /// Width of each low pass channel.
    #[arg(long)]
    pub hid1: Option<usize>,

    /// Width of each band pass channel.
    #[arg(long)]
    pub hid2: Option<usize>,

    /// Smoothing of the residual layer.
    #[arg(long)]
    pub smoo: Option<f32>,

    /// Dropout rate (1 - keep probability).
    #[arg(long)]
    pub dropout: Option<f32>,

    /// Normalization of the adjacency matrix.
    #[arg(long, value_enum)]
    pub normalization: Option<NormalizationArg>,

    /// Modulus order of the first band pass channel.
    #[arg(long = "order-1", alias = "order_1")]
    pub order_1: Option<u32>,

    /// Wavelet index of the first band pass channel.
    #[arg(long = "sct-inx1", alias = "sct_inx1")]
    pub sct_inx1: Option<usize>,

    /// Modulus order of the second band pass channel.
    #[arg(long = "order-2", alias = "order_2")]
    pub order_2: Option<u32>,

    /// Wavelet index of the second band pass channel.
    #[arg(long = "sct-inx2", alias = "sct_inx2")]
    pub sct_inx2: Option<usize>,

    /// Amount of scattering wavelets to build.
    #[arg(long)]
    pub wavelets: Option<u32>,

    /// Training nodes per class.
    #[arg(long)]
    pub train_per_class: Option<usize>,

    /// Amount of validation nodes.
    #[arg(long)]
    pub val_size: Option<usize>,

    /// Amount of test nodes.
    #[arg(long)]
    pub test_size: Option<usize>,

    /// Stops after this many epochs without validation improvement.
    #[arg(long)]
    pub patience: Option<usize>,

    #[arg(long, value_enum)]
    pub optimizer: Option<OptimizerArg>,

    /// Penalizes every parameter tensor instead of only the last one.
    #[arg(long)]
    pub l1_all_params: bool,

    /// Directory for `sct_time.txt` and `sct_accu.txt`.
    #[arg(long, conflicts_with = "no_traces")]
    pub trace_dir: Option<PathBuf>,

    /// Skips the accuracy and time traces.
    #[arg(long)]
    pub no_traces: bool,

    /// Writes a JSON summary of the run to this path.
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl Args {
    /// Applies every given option on top of the preset's configuration.
    pub fn resolve(self) -> RunConfig {
        let mut run = self.preset.run_config();

        set(&mut run.dataset, self.dataset);
        set(&mut run.data_dir, self.data_dir);

        let load = &mut run.load;
        if self.no_cuda {
            load.backend = Backend::Serial;
        }
        set(&mut load.normalization, self.normalization.map(Into::into));
        set(&mut load.wavelets, self.wavelets);
        set(&mut load.split.train_per_class, self.train_per_class);
        set(&mut load.split.val, self.val_size);
        set(&mut load.split.test, self.test_size);

        let model = &mut run.model;
        set(&mut model.hid1, self.hid1);
        set(&mut model.hid2, self.hid2);
        set(&mut model.dropout, self.dropout);
        set(&mut model.smoo, self.smoo);
        set(&mut model.selectors[0].order, self.order_1);
        set(&mut model.selectors[0].index, self.sct_inx1);
        set(&mut model.selectors[1].order, self.order_2);
        set(&mut model.selectors[1].index, self.sct_inx2);

        let training = &mut run.training;
        training.fastmode |= self.fastmode;
        set(&mut training.seed, self.seed.map(Some));
        set(&mut training.epochs, self.epochs);
        set(&mut training.learning_rate, self.lr);
        set(&mut training.weight_decay, self.weight_decay);
        set(&mut training.l1, self.l1);
        set(&mut training.patience, self.patience.map(Some));
        set(&mut training.optimizer, self.optimizer.map(Into::into));
        if self.l1_all_params {
            training.l1_mode = L1Mode::AllTensors;
        }

        if self.no_traces {
            run.trace_dir = None;
        }
        set(&mut run.trace_dir, self.trace_dir.map(Some));
        set(&mut run.summary, self.summary.map(Some));

        run
    }
}
