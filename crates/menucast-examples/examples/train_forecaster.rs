//! Train the graph demand forecaster.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example train_forecaster -- --data-dir data --epochs 30 --seed 1
//! RUST_LOG=debug cargo run --example train_forecaster -- --config menucast.toml
//! ```
//!
//! When `--data-dir` holds no `.npy` arrays a synthetic ring-graph dataset is
//! generated there first, together with `entities.json` and `dates.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use clap::Parser;
use menucast_core::config::{TrainerArgs, TrainerConfig};
use menucast_examples::{
    dictionary_paths, load_or_generate, run_on_device, BackendTask, SyntheticConfig,
};
use menucast_trainer::report::DEFAULT_NUM_DAYS;
use menucast_trainer::{ForecastDataset, GraphForecastPipeline};

#[derive(Parser)]
#[command(name = "train_forecaster")]
#[command(author, version, about = "Train the graph demand forecaster")]
struct Args {
    #[command(flatten)]
    trainer: TrainerArgs,

    /// Directory with the .npy dataset (generated when empty)
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Entities in a generated dataset
    #[arg(long, default_value = "12")]
    synthetic_entities: usize,

    /// Days of history in a generated dataset
    #[arg(long, default_value = "180")]
    synthetic_days: usize,

    /// Write the resolved configuration to this TOML file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Write the CSV report after training, starting at this date position
    #[arg(long)]
    test_start: Option<usize>,

    /// Days between the test start and the first reported date
    #[arg(long, default_value_t = DEFAULT_NUM_DAYS)]
    num_days: usize,
}

struct Train<'a> {
    config: TrainerConfig,
    dataset: &'a ForecastDataset,
    args: &'a Args,
}

impl BackendTask for Train<'_> {
    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<()> {
        let Self { config, dataset, args } = self;
        let mut pipeline = GraphForecastPipeline::<B>::new(config, dataset, device)?;
        let report = pipeline.train().context("training failed")?;
        println!("{report}");

        if let Some(test_start) = args.test_start {
            let forecast = pipeline
                .test(test_start, None, args.num_days)
                .context("writing the forecast report")?;
            println!(
                "report for {} entities over {} dates written to {}",
                forecast.entities.len(),
                forecast.dates.len(),
                report.run_dir.display()
            );
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let synthetic = SyntheticConfig {
        num_entities: args.synthetic_entities,
        num_days: args.synthetic_days,
        ..Default::default()
    };
    let dataset = load_or_generate(&args.data_dir, &synthetic)?;

    let mut config = args.trainer.clone().into_config()?;
    // generated dictionaries unless the user pointed elsewhere
    let (entities, dates) = dictionary_paths(&args.data_dir);
    if args.trainer.entity_dict.is_none() && entities.is_file() {
        config.entity_dict_path = entities;
    }
    if args.trainer.date_dict.is_none() && dates.is_file() {
        config.date_dict_path = dates;
    }
    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        log::info!("configuration saved to {}", path.display());
    }

    let device = config.device;
    run_on_device(
        device,
        Train {
            config,
            dataset: &dataset,
            args: &args,
        },
    )
}
