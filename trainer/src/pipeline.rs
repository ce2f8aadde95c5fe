use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use citation::load_citation;
use log::info;
use machine_learning::training::{EvalStats, History, TrainerBuilder, TrainingConfig};

use crate::{
    RunConfig,
    output::{self, Summary},
};

/// The results of a finished run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub test: EvalStats,
    pub history: History,
    pub total_time: Duration,
    pub stopped_early: bool,
}

/// Loads the dataset, trains on it, tests the result and writes the requested outputs.
pub fn execute(run: &RunConfig) -> Result<Outcome> {
    let dataset = load_citation(&run.data_dir, &run.dataset, &run.load).with_context(|| {
        format!(
            "loading the {} dataset from {}",
            run.dataset,
            run.data_dir.display()
        )
    })?;

    let model = run
        .model
        .config(dataset.inputs().num_features(), dataset.num_classes());
    let training = TrainingConfig {
        epoch_tag: Some(format!("Hid1: {:04} Hid2: {:04}", model.hid1, model.hid2)),
        ..run.training.clone()
    };

    let mut trainer = TrainerBuilder::new()
        .build(&model, &training, dataset)
        .context("building the trainer")?;

    let start = Instant::now();
    trainer.train().context("training")?;
    let total_time = start.elapsed();

    println!("Optimization Finished!");
    println!("Total time elapsed: {:.4}s", total_time.as_secs_f64());

    let test = trainer.test().context("testing")?;
    println!("Hid1 {}, Hid2 {}", model.hid1, model.hid2);
    println!(
        "Test set results: loss= {:.4} accuracy= {:.4}",
        test.loss, test.accuracy
    );

    let outcome = Outcome {
        test,
        history: trainer.history().clone(),
        total_time,
        stopped_early: trainer.stopped_early(),
    };

    if let Some(dir) = &run.trace_dir {
        let (time, accuracy) = output::write_traces(dir, &outcome.history)?;
        info!("saved traces to {} and {}", time.display(), accuracy.display());
    }

    if let Some(path) = &run.summary {
        let summary = Summary {
            config: run,
            test,
            epochs_run: outcome.history.len(),
            stopped_early: outcome.stopped_early,
            total_time: total_time.as_secs_f64(),
            history: &outcome.history,
        };

        output::write_summary(path, &summary)?;
        info!("saved run summary to {}", path.display());
    }

    Ok(outcome)
}
