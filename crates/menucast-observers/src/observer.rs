use menucast_core::error::Result;

/// Metric names recorded by the trainer.
pub mod tags {
    pub const LOSS_TRAIN: &str = "Loss/train";
    pub const LOSS_VALIDATION: &str = "Loss/validation";
    pub const RMSE_VALIDATION: &str = "RMSE/validation";
    pub const MAE_VALIDATION: &str = "MAE/validation";
    pub const MAPE_VALIDATION: &str = "MAPE/validation";
    pub const MIN_RMSE: &str = "Evaluation/Min_RMSE";
    pub const MIN_MAE: &str = "Evaluation/Min_MAE";
    pub const MIN_MAPE: &str = "Evaluation/Min_MAPE";
}

/// Append-only sink for scalar series.
///
/// A series is identified by its tag and indexed by `step` (the epoch for
/// everything the trainer records). Sinks never reorder or drop values.
pub trait ScalarObserver {
    /// Record `value` for `tag` at `step`.
    fn record(&mut self, tag: &str, value: f64, step: usize) -> Result<()>;

    /// Push buffered values to their destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<O: ScalarObserver + ?Sized> ScalarObserver for Box<O> {
    fn record(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        (**self).record(tag, value, step)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Fans each value out to every attached observer, in attach order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn ScalarObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, observer: Box<dyn ScalarObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ScalarObserver for ObserverSet {
    fn record(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        for observer in &mut self.observers {
            observer.record(tag, value, step)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for observer in &mut self.observers {
            observer.flush()?;
        }
        Ok(())
    }
}
