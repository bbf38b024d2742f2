use indexmap::IndexMap;
use menucast_core::error::Result;

use crate::observer::ScalarObserver;

/// In-memory sink: one `(step, value)` series per tag.
#[derive(Debug, Clone, Default)]
pub struct MemoryObserver {
    series: IndexMap<String, Vec<(usize, f64)>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self, tag: &str) -> Option<&[(usize, f64)]> {
        self.series.get(tag).map(Vec::as_slice)
    }

    /// Values of `tag` without their steps.
    pub fn values(&self, tag: &str) -> Vec<f64> {
        self.series(tag)
            .map(|s| s.iter().map(|&(_, v)| v).collect())
            .unwrap_or_default()
    }

    pub fn last(&self, tag: &str) -> Option<f64> {
        self.series(tag).and_then(|s| s.last()).map(|&(_, v)| v)
    }

    /// Tags in first-recorded order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

impl ScalarObserver for MemoryObserver {
    fn record(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        self.series
            .entry(tag.to_string())
            .or_default()
            .push((step, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    #[test]
    fn test_series_keep_insertion_order() {
        let mut obs = MemoryObserver::new();
        obs.record(tags::LOSS_VALIDATION, 2.0, 1).unwrap();
        obs.record(tags::LOSS_TRAIN, 1.0, 1).unwrap();
        obs.record(tags::LOSS_VALIDATION, 1.5, 2).unwrap();

        let tags: Vec<&str> = obs.tags().collect();
        assert_eq!(tags, vec![tags::LOSS_VALIDATION, tags::LOSS_TRAIN]);
        assert_eq!(obs.values(tags::LOSS_VALIDATION), vec![2.0, 1.5]);
        assert_eq!(obs.last(tags::LOSS_TRAIN), Some(1.0));
        assert!(obs.series("missing").is_none());
    }
}
