//! Evaluate a saved checkpoint and write the per-entity report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example test_forecaster -- --run-dir ~/.local/share/menucast/logs/run_0 \
//!     --data-dir data --test-start 128
//! ```
//!
//! Writes `prediction.csv`, `actual.csv` and `rmse_mse.csv` into the run
//! directory and prints the run's validation curve.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use clap::Parser;
use menucast_core::config::{TrainerArgs, TrainerConfig};
use menucast_examples::{dictionary_paths, run_on_device, BackendTask};
use menucast_observers::{read_series, tags};
use menucast_trainer::report::DEFAULT_NUM_DAYS;
use menucast_trainer::{ForecastDataset, GraphForecastPipeline};

#[derive(Parser)]
#[command(name = "test_forecaster")]
#[command(author, version, about = "Evaluate a trained forecaster checkpoint")]
struct Args {
    #[command(flatten)]
    trainer: TrainerArgs,

    /// Run directory holding time_stamp_model.mpk and regression_model.mpk
    #[arg(long)]
    run_dir: PathBuf,

    /// Directory with the .npy dataset
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Date position where the test window starts
    #[arg(long)]
    test_start: usize,

    /// Days between the test start and the first reported date
    #[arg(long, default_value_t = DEFAULT_NUM_DAYS)]
    num_days: usize,
}

struct Test<'a> {
    config: TrainerConfig,
    dataset: &'a ForecastDataset,
    args: &'a Args,
}

impl BackendTask for Test<'_> {
    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<()> {
        let Self { config, dataset, args } = self;
        let mut pipeline = GraphForecastPipeline::<B>::new(config, dataset, device)?;
        let report = pipeline
            .test(args.test_start, Some(&args.run_dir), args.num_days)
            .with_context(|| format!("testing {}", args.run_dir.display()))?;

        println!("{:<24} {:>10} {:>10}", "entity", "rmse", "mae");
        for (i, name) in report.entities.iter().enumerate() {
            println!(
                "{name:<24} {:>10.4} {:>10.4}",
                report.errors.rmse[i], report.errors.mse[i]
            );
        }

        match read_series(&args.run_dir, tags::LOSS_VALIDATION) {
            Ok(series) if !series.is_empty() => {
                println!("\nvalidation loss by epoch:");
                for (epoch, loss) in series {
                    println!("  {epoch:>4}  {loss:.6}");
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("no event stream: {e}"),
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let dataset = ForecastDataset::load_dir(&args.data_dir)
        .with_context(|| format!("loading dataset from {}", args.data_dir.display()))?;

    let mut config = args.trainer.clone().into_config()?;
    let (entities, dates) = dictionary_paths(&args.data_dir);
    if args.trainer.entity_dict.is_none() && entities.is_file() {
        config.entity_dict_path = entities;
    }
    if args.trainer.date_dict.is_none() && dates.is_file() {
        config.date_dict_path = dates;
    }

    let device = config.device;
    run_on_device(
        device,
        Test {
            config,
            dataset: &dataset,
            args: &args,
        },
    )
}
