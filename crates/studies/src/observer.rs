//! Creation counters for stored records

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub const DATA_POINTS_CREATED: &str = "datapoints.created";

/// Notified once per created record.
pub trait CreationObserver: Send + Sync {
    fn increment(&self, metric: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CreationObserver for NoopObserver {
    fn increment(&self, _metric: &str) {}
}

/// In-memory counter per metric name.
#[derive(Debug, Default)]
pub struct CreationCounter {
    counts: Mutex<HashMap<String, u64>>,
}

impl CreationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: &str) -> u64 {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.get(metric).copied().unwrap_or(0)
    }
}

impl CreationObserver for CreationCounter {
    fn increment(&self, metric: &str) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        *counts.entry(metric.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn counter_tracks_metrics_independently() {
        let counter = CreationCounter::new();
        counter.increment(DATA_POINTS_CREATED);
        counter.increment(DATA_POINTS_CREATED);
        counter.increment("documents.created");

        assert_eq!(counter.get(DATA_POINTS_CREATED), 2);
        assert_eq!(counter.get("documents.created"), 1);
        assert_eq!(counter.get("files.created"), 0);
    }

    #[test]
    fn counts_survive_a_poisoned_lock() {
        let counter = Arc::new(CreationCounter::new());
        counter.increment(DATA_POINTS_CREATED);

        let poisoner = Arc::clone(&counter);
        let outcome = std::thread::spawn(move || {
            let _guard = poisoner.counts.lock().unwrap();
            panic!("poison the counter lock");
        })
        .join();
        assert!(outcome.is_err());
        assert!(counter.counts.is_poisoned());

        counter.increment(DATA_POINTS_CREATED);
        assert_eq!(counter.get(DATA_POINTS_CREATED), 2);
    }
}
