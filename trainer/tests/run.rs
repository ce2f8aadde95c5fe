use std::{fs, path::Path};

use citation::DataErr;
use clap::Parser;
use machine_learning::MlErr;
use tempfile::TempDir;
use trainer::{Args, RunConfig, execute, output};

const CONTENT: &str = "\
n1 1 0 0 a
n2 0 1 0 b
n3 1 1 0 a
n4 0 1 1 b
n5 1 0 1 a
n6 0 0 1 b
n7 1 1 1 a
n8 0 1 0 b
";

const CITES: &str = "\
n1 n3
n3 n5
n5 n7
n2 n4
n4 n6
n6 n8
n1 n2
n7 n8
";

fn dataset_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("toy.content"), CONTENT).unwrap();
    fs::write(dir.path().join("toy.cites"), CITES).unwrap();
    dir
}

/// A small run over the toy dataset, `extra` options go last so they win.
fn run_config(dir: &Path, extra: &[&str]) -> RunConfig {
    let data_dir = dir.to_string_lossy().into_owned();
    let base = [
        "sct-train",
        "--dataset",
        "toy",
        "--data-dir",
        data_dir.as_str(),
        "--epochs",
        "5",
        "--hid1",
        "4",
        "--hid2",
        "3",
        "--wavelets",
        "2",
        "--train-per-class",
        "1",
        "--val-size",
        "2",
        "--test-size",
        "3",
        "--no-cuda",
    ];

    let args = base.iter().chain(extra).copied();
    Args::try_parse_from(args).unwrap().resolve()
}

fn has_cause<F>(err: &anyhow::Error, pred: F) -> bool
where
    F: Fn(&(dyn std::error::Error + 'static)) -> bool,
{
    err.chain().any(pred)
}

#[test]
fn traces_have_one_line_per_epoch() {
    let dir = dataset_dir();
    let traces = dir.path().join("traces");
    let traces_arg = traces.to_string_lossy().into_owned();
    let run = run_config(dir.path(), &["--trace-dir", traces_arg.as_str()]);

    let outcome = execute(&run).unwrap();
    assert_eq!(outcome.history.len(), 5);

    let read = |name| {
        fs::read_to_string(traces.join(name))
            .unwrap()
            .lines()
            .map(|line| line.parse::<f64>().unwrap())
            .collect::<Vec<_>>()
    };

    let accuracy = read(output::ACCURACY_TRACE);
    let time = read(output::TIME_TRACE);

    assert_eq!(accuracy.len(), 5);
    assert_eq!(time.len(), 5);
    assert!(accuracy.iter().all(|a| (0. ..=1.).contains(a)));
    assert!(time.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn summary_holds_the_config_and_results() {
    let dir = dataset_dir();
    let path = dir.path().join("out").join("summary.json");
    let path_arg = path.to_string_lossy().into_owned();
    let run = run_config(dir.path(), &["--no-traces", "--summary", path_arg.as_str()]);

    let outcome = execute(&run).unwrap();

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(summary["config"]["dataset"], "toy");
    assert_eq!(summary["config"]["preset"], "pubmed");
    assert_eq!(summary["epochs_run"], 5);
    assert_eq!(summary["stopped_early"], false);
    assert_eq!(
        summary["history"]["val_accuracy"].as_array().unwrap().len(),
        5
    );

    let accuracy = summary["test"]["accuracy"].as_f64().unwrap();
    assert_eq!(accuracy, outcome.test.accuracy);
    assert!(!dir.path().join(output::ACCURACY_TRACE).exists());
}

#[test]
fn seeded_runs_repeat() {
    let dir = dataset_dir();
    let run = run_config(dir.path(), &["--no-traces", "--seed", "7"]);

    let first = execute(&run).unwrap();
    let second = execute(&run).unwrap();

    assert_eq!(first.history.val_accuracy(), second.history.val_accuracy());
    assert_eq!(first.history.train_loss(), second.history.train_loss());
    assert_eq!(first.test, second.test);
}

#[test]
fn cora_preset_runs_with_its_band_pass_selectors() {
    let dir = dataset_dir();
    let run = run_config(
        dir.path(),
        &["--preset", "cora", "--wavelets", "4", "--epochs", "3"],
    );
    assert_eq!(run.trace_dir, None);

    let outcome = execute(&run).unwrap();
    assert_eq!(outcome.history.len(), 3);
    assert!(outcome.test.loss.is_finite());
}

#[test]
fn out_of_range_selector_fails() {
    let dir = dataset_dir();
    let run = run_config(dir.path(), &["--no-traces", "--sct-inx2", "2"]);

    let err = execute(&run).unwrap_err();
    assert!(has_cause(&err, |e| matches!(
        e.downcast_ref::<MlErr>(),
        Some(MlErr::InvalidSelector {
            index: 2,
            available: 2
        })
    )));
}

#[test]
fn missing_dataset_fails() {
    let dir = dataset_dir();
    let run = run_config(dir.path(), &["--no-traces", "--dataset", "citeseer"]);

    let err = execute(&run).unwrap_err();
    assert!(has_cause(&err, |e| matches!(
        e.downcast_ref::<DataErr>(),
        Some(DataErr::Io { .. })
    )));
}
