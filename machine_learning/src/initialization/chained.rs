use super::ParamGen;

/// A parameter generator that delegates to a sequence of generators, moving to the next
/// one as each is exhausted.
///
/// Models register one generator per tensor, so each tensor can have its own distribution
/// while the whole buffer is still sampled with a single call.
pub struct ChainedParamGen {
    param_gens: Vec<Box<dyn ParamGen>>,
    curr: usize,
}

impl ChainedParamGen {
    /// Creates a new `ChainedParamGen`.
    ///
    /// # Arguments
    /// * `param_gens` - The generators in the order their samples are laid out.
    pub fn new(param_gens: Vec<Box<dyn ParamGen>>) -> Self {
        Self {
            param_gens,
            curr: 0,
        }
    }
}

impl ParamGen for ChainedParamGen {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        let mut sample = Vec::with_capacity(n);

        while sample.len() < n {
            let param_gen = self.param_gens.get_mut(self.curr)?;

            match param_gen.sample(n - sample.len()) {
                Some(part) => sample.extend(part),
                None => self.curr += 1,
            }
        }

        Some(sample)
    }
}
