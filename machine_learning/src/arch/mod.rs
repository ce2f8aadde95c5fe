pub mod activations;
pub mod layers;
pub mod loss;
mod model;
mod scattering_gcn;

pub use model::{Mode, Model, ParamTensor};
pub use scattering_gcn::{ModelConfig, ScatteringGcn, Selector};
