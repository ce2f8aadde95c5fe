pub mod cli;
mod config;
pub mod output;
mod pipeline;
mod preset;

pub use cli::Args;
pub use config::{ModelParams, RunConfig};
pub use pipeline::{Outcome, execute};
pub use preset::Preset;
