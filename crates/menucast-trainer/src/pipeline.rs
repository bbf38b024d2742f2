use std::ops::Range;
use std::path::Path;
use std::sync::Mutex;

use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use indicatif::{ProgressBar, ProgressStyle};
use menucast_core::config::TrainerConfig;
use menucast_core::error::{ForecastError, Result};
use menucast_core::metrics::RunningMinima;
use menucast_core::rng::RngKey;
use menucast_models::{
    adjacency_tensor, normalize_adjacency, ForecastHead, GraphEmbedding, GraphEmbeddingConfig,
    NodeEmbedding, RegressionHead, RegressionHeadConfig,
};
use menucast_observers::{tags, EventFileWriter, ObserverSet, ScalarObserver};

use crate::batching::node_batches;
use crate::checkpoint::{
    has_checkpoint, load_module, save_module, BestCheckpoint, EMBEDDING_CHECKPOINT,
    HEAD_CHECKPOINT,
};
use crate::clip::clip_grad_norm;
use crate::dataset::{DeviceSplit, ForecastDataset};
use crate::evaluation::{evaluate_split, EvaluationOutput};
use crate::report::{load_dictionary, ForecastReport};
use crate::run::{CounterFileAllocator, RunAllocator, RunDirectory};
use crate::schedule::lr_after_epoch;
use crate::summary::{EpochSummary, TrainingReport};

/// Burn's backend RNG is process-global; seeding and initialisation must not
/// interleave with another pipeline's.
static BACKEND_SEED: Mutex<()> = Mutex::new(());

/// Adam with a 1e-8 epsilon; one is built per model per timestamp.
pub(crate) fn adam_config() -> AdamConfig {
    AdamConfig::new().with_epsilon(1e-8)
}

/// Pipeline over the reference graph embedding and regression head.
pub type GraphForecastPipeline<B> = ForecastPipeline<B, GraphEmbedding<B>, RegressionHead<B>>;

/// Trains an embedding model `E` and a regression head `R` together.
///
/// The pipeline owns both parameter collections. Datasets live on the
/// inner (non-autodiff) backend and are lifted per timestamp while training.
pub struct ForecastPipeline<B, E, R>
where
    B: AutodiffBackend,
    E: NodeEmbedding<B> + AutodiffModule<B>,
    R: ForecastHead<B> + AutodiffModule<B>,
{
    config: TrainerConfig,
    embedder: E,
    head: R,
    train_split: DeviceSplit<B::InnerBackend>,
    test_split: DeviceSplit<B::InnerBackend>,
    num_nodes: usize,
    horizon: usize,
    device: B::Device,
    rng: RngKey,
    learning_rate: f64,
    run: Option<RunDirectory>,
    events: Option<EventFileWriter>,
    observers: ObserverSet,
    allocator: Box<dyn RunAllocator>,
}

impl<B: AutodiffBackend> ForecastPipeline<B, GraphEmbedding<B>, RegressionHead<B>> {
    /// Build the reference models around the dataset's adjacency.
    ///
    /// The embedding width defaults to the feature width `F`. With a seed
    /// set, the backend RNG is seeded first so parameter initialisation
    /// repeats across runs.
    pub fn new(config: TrainerConfig, dataset: &ForecastDataset, device: B::Device) -> Result<Self> {
        config.validate()?;
        let n = dataset.num_nodes();
        let features = dataset.num_features();
        let embedding_dim = config.embedding_dim.unwrap_or(features);

        let normalized = normalize_adjacency(&dataset.adjacency_vec(), n)?;
        let adjacency = adjacency_tensor::<B>(&normalized, n, &device)?;

        let (embedder, head) = {
            let _guard = BACKEND_SEED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(seed) = config.seed {
                B::seed(seed);
            }
            let embedder = GraphEmbeddingConfig::new(features, embedding_dim)
                .with_num_layers(config.num_gnn_layers)
                .init(adjacency, &device);
            let head = RegressionHeadConfig::new(embedding_dim, dataset.horizon()).init(&device);
            (embedder, head)
        };

        Self::with_models(config, dataset, embedder, head, device)
    }
}

impl<B, E, R> ForecastPipeline<B, E, R>
where
    B: AutodiffBackend,
    E: NodeEmbedding<B> + AutodiffModule<B>,
    R: ForecastHead<B> + AutodiffModule<B>,
    E::InnerModule: NodeEmbedding<B::InnerBackend>,
    R::InnerModule: ForecastHead<B::InnerBackend>,
{
    /// Wrap caller-built models. Both must already live on `device`.
    pub fn with_models(
        config: TrainerConfig,
        dataset: &ForecastDataset,
        embedder: E,
        head: R,
        device: B::Device,
    ) -> Result<Self> {
        config.validate()?;

        let train_split = DeviceSplit::upload(&dataset.train, &device);
        let test_split = DeviceSplit::upload(&dataset.test, &device);
        let rng = RngKey::from_optional_seed(config.seed);
        log::info!(
            "pipeline: {} entities, {} features, horizon {}, {} train / {} test timestamps",
            dataset.num_nodes(),
            dataset.num_features(),
            dataset.horizon(),
            dataset.train.num_timestamps(),
            dataset.test.num_timestamps()
        );

        Ok(Self {
            learning_rate: config.learning_rate,
            config,
            embedder,
            head,
            train_split,
            test_split,
            num_nodes: dataset.num_nodes(),
            horizon: dataset.horizon(),
            device,
            rng,
            run: None,
            events: None,
            observers: ObserverSet::new(),
            allocator: Box::new(CounterFileAllocator),
        })
    }

    /// Replace the run-version allocator.
    pub fn with_allocator(mut self, allocator: Box<dyn RunAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Send every recorded scalar to `observer` as well as the run's event file.
    pub fn attach_observer(&mut self, observer: Box<dyn ScalarObserver>) {
        self.observers.attach(observer);
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn head(&self) -> &R {
        &self.head
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Rate the next epoch will train with.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn run_dir(&self) -> Option<&Path> {
        self.run.as_ref().map(RunDirectory::path)
    }

    pub fn run_version(&self) -> Option<u64> {
        self.run.as_ref().map(RunDirectory::version)
    }

    /// Train for epochs `1..epochs` in a freshly allocated run directory.
    pub fn train(&mut self) -> Result<TrainingReport> {
        self.start_run()?;
        let (run_dir, run_version) = match &self.run {
            Some(run) => (run.path().to_path_buf(), run.version()),
            None => return Err(ForecastError::Config("run directory was not created".into())),
        };
        let mut report = TrainingReport::new(run_dir, run_version);

        let num_timestamps = self.train_split.num_timestamps();
        let batches = node_batches(self.num_nodes, self.config.node_batch_size);
        let epochs = self.config.epochs;
        let mut best = BestCheckpoint::new();
        let mut minima = RunningMinima::default();
        let mut train_loss = 0.0f64;

        let progress = ProgressBar::new(epochs.saturating_sub(1) as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            progress.set_style(style);
        }

        for epoch in 1..epochs {
            let (next, epoch_key) = self.rng.split_two();
            self.rng = next;

            if !self.config.carry_train_loss {
                train_loss = 0.0;
            }
            for index in epoch_key.permutation(num_timestamps) {
                let loss = self.train_timestamp(index, &batches);
                if !loss.is_finite() {
                    log::warn!("epoch {epoch}: non-finite loss {loss} at timestamp {index}");
                }
                log::debug!("epoch {epoch} timestamp {index}: loss {loss:.6}");
                train_loss += loss;
            }
            train_loss /= num_timestamps as f64;

            let epoch_lr = self.learning_rate;
            self.learning_rate = lr_after_epoch(self.learning_rate, epoch, &self.config.schedule);

            progress.set_message(format!("epoch {epoch}/{} loss {train_loss:.4}", epochs - 1));
            progress.inc(1);
            self.record(tags::LOSS_TRAIN, train_loss, epoch)?;

            let output = self.evaluate()?;
            let metrics = output.metrics();
            self.record(tags::LOSS_VALIDATION, output.loss, epoch)?;
            self.record(tags::RMSE_VALIDATION, f64::from(metrics.rmse), epoch)?;
            self.record(tags::MAE_VALIDATION, f64::from(metrics.mae), epoch)?;
            self.record(tags::MAPE_VALIDATION, f64::from(metrics.mape), epoch)?;

            let checkpointed = best.improve(output.loss, epoch);
            if checkpointed {
                self.save_model()?;
            }

            minima.update(&metrics);
            self.record(tags::MIN_RMSE, f64::from(minima.rmse), epoch)?;
            self.record(tags::MIN_MAE, f64::from(minima.mae), epoch)?;
            self.record(tags::MIN_MAPE, f64::from(minima.mape), epoch)?;

            log::info!(
                "epoch {epoch}/{}: train {train_loss:.6} validation {:.6} {metrics}{}",
                epochs - 1,
                output.loss,
                if checkpointed { " (saved)" } else { "" }
            );
            report.epochs.push(EpochSummary {
                epoch,
                train_loss,
                validation_loss: output.loss,
                metrics,
                learning_rate: epoch_lr,
                checkpointed,
            });
        }
        progress.finish_and_clear();
        self.flush_observers()?;

        report.best_epoch = best.epoch();
        report.best_loss = best.loss();
        report.minima = minima;
        Ok(report)
    }

    /// One optimizer step over every node batch of timestamp `index`.
    /// Returns the summed batch loss.
    fn train_timestamp(&mut self, index: usize, batches: &[Range<usize>]) -> f64 {
        let (data, labels) = self.train_split.timestamp(index);
        let data = Tensor::<B, 2>::from_inner(data);
        let labels = Tensor::<B, 2>::from_inner(labels);
        let mse = MseLoss::new();

        let mut total: Option<Tensor<B, 1>> = None;
        for batch in batches {
            let logits = self.head.regress(self.embedder.embed(data.clone()));
            let predicted = logits.slice([batch.clone(), 0..self.horizon]);
            let expected = labels.clone().slice([batch.clone(), 0..self.horizon]);
            let loss = mse
                .forward(predicted, expected, Reduction::Mean)
                .div_scalar(batch.len() as f64);
            total = Some(match total {
                Some(sum) => sum + loss,
                None => loss,
            });
        }
        let Some(total) = total else {
            return 0.0;
        };
        let value = total.clone().into_scalar().elem::<f64>();

        let mut grads = total.backward();
        let mut embedder_grads = GradientsParams::from_module(&mut grads, &self.embedder);
        let mut head_grads = GradientsParams::from_module(&mut grads, &self.head);

        let max_norm = f64::from(self.config.grad_clip_norm);
        clip_grad_norm::<B, _>(&self.embedder, &mut embedder_grads, max_norm);
        clip_grad_norm::<B, _>(&self.head, &mut head_grads, max_norm);

        // Adam state is per parameter, so one fresh optimizer per model is
        // the same as one over both.
        let mut embedder_optim = adam_config().init::<B, E>();
        let mut head_optim = adam_config().init::<B, R>();
        self.embedder = embedder_optim.step(self.learning_rate, self.embedder.clone(), embedder_grads);
        self.head = head_optim.step(self.learning_rate, self.head.clone(), head_grads);

        value
    }

    /// Forward pass over every test timestamp in a fresh random order.
    ///
    /// Runs on the inner-backend view of both models, so no gradients are
    /// tracked and the trainable models are never touched.
    pub fn evaluate(&mut self) -> Result<EvaluationOutput> {
        let (next, key) = self.rng.split_two();
        self.rng = next;
        let order = key.permutation(self.test_split.num_timestamps());

        let embedder = self.embedder.valid();
        let head = self.head.valid();
        evaluate_split(&embedder, &head, &self.test_split, order)
    }

    /// Write both models into the active run directory.
    pub fn save_model(&self) -> Result<()> {
        let run = self.run.as_ref().ok_or_else(|| {
            ForecastError::Config("cannot save a checkpoint without an active run".into())
        })?;
        save_module(&self.embedder, run.path(), EMBEDDING_CHECKPOINT)?;
        save_module(&self.head, run.path(), HEAD_CHECKPOINT)?;
        log::debug!("checkpoint written to {}", run.path().display());
        Ok(())
    }

    /// Restore both models.
    ///
    /// With a path, loads from that run directory and makes it the active
    /// run; its version comes from the trailing `_<n>`. Without one, reloads
    /// the active run's checkpoint, keeping the in-memory parameters if
    /// nothing was saved yet.
    pub fn load_model(&mut self, model_path: Option<&Path>) -> Result<()> {
        match model_path {
            Some(path) => {
                let run = RunDirectory::from_existing(path)?;
                self.restore_from(run.path())?;
                self.events = Some(EventFileWriter::create(run.path())?);
                log::info!("resumed run_{} from {}", run.version(), path.display());
                self.run = Some(run);
                Ok(())
            }
            None => {
                let run_dir = match &self.run {
                    Some(run) => run.path().to_path_buf(),
                    None => {
                        return Err(ForecastError::Config(
                            "no checkpoint path given and no active run".into(),
                        ))
                    }
                };
                if has_checkpoint(&run_dir) {
                    self.restore_from(&run_dir)
                } else {
                    log::warn!(
                        "no checkpoint in {}, using in-memory parameters",
                        run_dir.display()
                    );
                    Ok(())
                }
            }
        }
    }

    fn restore_from(&mut self, run_dir: &Path) -> Result<()> {
        self.embedder = load_module(self.embedder.clone(), run_dir, EMBEDDING_CHECKPOINT, &self.device)?;
        self.head = load_module(self.head.clone(), run_dir, HEAD_CHECKPOINT, &self.device)?;
        Ok(())
    }

    /// Load a checkpoint, evaluate it and write the CSV report into the run
    /// directory.
    ///
    /// Forecast dates start at position `test_start + num_days` of the date
    /// dictionary.
    pub fn test(
        &mut self,
        test_start: usize,
        model_path: Option<&Path>,
        num_days: usize,
    ) -> Result<ForecastReport> {
        self.load_model(model_path)?;
        let output = self.evaluate()?;

        let entities = load_dictionary(&self.config.entity_dict_path)?;
        let dates = load_dictionary(&self.config.date_dict_path)?;
        let report = ForecastReport::build(&output, &entities, &dates, test_start + num_days)?;

        let run = self.run.as_ref().ok_or_else(|| {
            ForecastError::Config("no active run to write the report into".into())
        })?;
        report.write(run.path())?;
        log::info!(
            "test loss {:.6}, {} on {} entities",
            output.loss,
            output.metrics(),
            report.entities.len()
        );
        Ok(report)
    }

    fn start_run(&mut self) -> Result<()> {
        if let Some(mut events) = self.events.take() {
            events.flush()?;
        }
        let run = RunDirectory::allocate(&self.config.log_root(), self.allocator.as_mut())?;
        self.events = Some(EventFileWriter::create(run.path())?);
        self.run = Some(run);
        Ok(())
    }

    fn record(&mut self, tag: &str, value: f64, epoch: usize) -> Result<()> {
        if let Some(events) = self.events.as_mut() {
            events.record(tag, value, epoch)?;
        }
        self.observers.record(tag, value, epoch)
    }

    fn flush_observers(&mut self) -> Result<()> {
        if let Some(events) = self.events.as_mut() {
            events.flush()?;
        }
        self.observers.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adam_epsilon() {
        let config = serde_json::to_value(adam_config()).unwrap();
        let epsilon = config["epsilon"].as_f64().unwrap() as f32;
        assert_eq!(epsilon, 1e-8);
    }
}
