mod builder;
mod error;
mod loader;
mod normalization;
mod scattering;
mod split;

pub use builder::GraphBuilder;
pub use error::{DataErr, Result};
pub use loader::{LoadOptions, load_citation};
pub use normalization::{Normalization, row_normalize};
pub use scattering::{lazy_walk, wavelets};
pub use split::{SplitSizes, planetoid_split};
