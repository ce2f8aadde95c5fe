use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use machine_learning::training::{EvalStats, History};
use serde::Serialize;

use crate::RunConfig;

pub const TIME_TRACE: &str = "sct_time.txt";
pub const ACCURACY_TRACE: &str = "sct_accu.txt";

/// What a run leaves behind in its JSON summary.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub config: &'a RunConfig,
    pub test: EvalStats,
    pub epochs_run: usize,
    pub stopped_early: bool,
    /// Wall clock seconds spent training.
    pub total_time: f64,
    pub history: &'a History,
}

/// Formats `value` the way numpy's `savetxt` does by default, e.g. `1.5e-01`.
pub fn scientific(value: f64) -> String {
    let formatted = format!("{value:.18e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(exp) => format!("{mantissa}e{exp:+03}"),
            Err(_) => formatted,
        },
        // NaN and infinities have no exponent.
        None => formatted,
    }
}

fn write_column<I>(path: &Path, values: I) -> Result<()>
where
    I: IntoIterator<Item = f64>,
{
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);

    for value in values {
        writeln!(out, "{}", scientific(value))?;
    }

    out.flush()
        .with_context(|| format!("writing {}", path.display()))
}

/// Writes the elapsed time and validation accuracy traces into `dir`, one epoch per line.
///
/// # Returns
/// The paths of the time and accuracy traces.
pub fn write_traces(dir: &Path, history: &History) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let time = dir.join(TIME_TRACE);
    let accuracy = dir.join(ACCURACY_TRACE);

    write_column(&time, history.elapsed().iter().copied())?;
    write_column(&accuracy, history.val_accuracy().iter().copied())?;

    Ok((time, accuracy))
}

pub fn write_summary(path: &Path, summary: &Summary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, summary)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}
