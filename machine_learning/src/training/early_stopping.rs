use log::debug;

/// Stops training once the monitored error has been worse than the best seen for `patience`
/// consecutive observations. Matching the best resets the count.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    counter: usize,
    best: Option<f64>,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            counter: 0,
            best: None,
        }
    }

    /// Records a new error value.
    ///
    /// # Returns
    /// Whether training should stop.
    pub fn observe(&mut self, error: f64) -> bool {
        match self.best {
            Some(best) if error > best => {
                self.counter += 1;
                debug!("early stopping counter: {} out of {}", self.counter, self.patience);
            }
            _ => {
                self.best = Some(error);
                self.counter = 0;
            }
        }

        self.counter >= self.patience
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_patience_without_improvement() {
        let mut stopping = EarlyStopping::new(2);

        assert!(!stopping.observe(0.5));
        assert!(!stopping.observe(0.4));
        assert!(!stopping.observe(0.45));
        assert!(stopping.observe(0.45));
        assert_eq!(stopping.best(), Some(0.4));
    }

    #[test]
    fn improvements_reset_the_counter() {
        let mut stopping = EarlyStopping::new(2);

        assert!(!stopping.observe(0.5));
        assert!(!stopping.observe(0.6));
        assert!(!stopping.observe(0.3));
        assert!(!stopping.observe(0.35));
        assert!(!stopping.observe(0.3));
        assert!(!stopping.observe(0.35));
        assert!(stopping.observe(0.35));
    }
}
