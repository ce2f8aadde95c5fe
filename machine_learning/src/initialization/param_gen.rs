/// A `ParamGen` produces the initial values of a model's parameters.
pub trait ParamGen {
    /// Samples at most `n` parameters.
    ///
    /// # Arguments
    /// * `n` - The upper limit of samples to generate.
    ///
    /// # Returns
    /// The samples, or `None` once the generator is exhausted.
    fn sample(&mut self, n: usize) -> Option<Vec<f32>>;
}
