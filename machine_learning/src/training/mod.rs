mod builder;
mod config;
mod early_stopping;
mod metrics;
mod regularization;
mod session;
mod trainer;

pub use builder::TrainerBuilder;
pub use config::{L1Mode, OptimizerKind, TrainingConfig};
pub use early_stopping::EarlyStopping;
pub use metrics::{EpochStats, EvalStats, History};
pub use regularization::{add_l1_grad, l1_penalty};
pub use session::Session;
pub use trainer::Trainer;
