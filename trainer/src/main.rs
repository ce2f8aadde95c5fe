use clap::Parser;
use log::{LevelFilter, debug};

use trainer::{Args, execute};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let run = args.resolve();
    debug!("{run:?}");

    execute(&run)?;
    Ok(())
}
