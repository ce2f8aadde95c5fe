mod adam;
mod gradient_descent;
mod optimizer;
mod schedule;

pub use adam::Adam;
pub use gradient_descent::GradientDescent;
pub use optimizer::Optimizer;
pub use schedule::LrSchedule;

use crate::{MlErr, Result};

fn check_sizes(grad: &[f32], params: &[f32]) -> Result<()> {
    if grad.len() != params.len() {
        return Err(MlErr::SizeMismatch {
            what: "gradient",
            got: grad.len(),
            expected: params.len(),
        });
    }

    Ok(())
}
