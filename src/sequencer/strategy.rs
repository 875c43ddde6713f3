use std::collections::HashMap;

use chrono::Utc;

use crate::cancel::Cancellation;
use crate::models::Track;

use super::SequenceError;
use super::generator::{DEFAULT_STRATEGY_NAME, HarmonicSorter};

/// Knobs shared by every sorting strategy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOptions {
    /// Maximum number of tracks to emit; `None` or `Some(0)` emits everything
    pub limit: Option<usize>,
    /// Seed for tie-breaking randomness; `None` seeds from the clock
    pub seed: Option<u64>,
}

/// Arranges tracks in an order tailored to a specific optimisation strategy
#[cfg_attr(test, mockall::automock)]
pub trait Sorter {
    fn name(&self) -> &'static str;

    fn sort(
        &self,
        tracks: &[Track],
        options: &SortOptions,
        cancel: &Cancellation,
    ) -> Result<Vec<Track>, SequenceError>;
}

/// Ordered output plus notes about the run
#[derive(Debug, Clone)]
pub struct SortResult {
    pub strategy: String,
    pub ordered: Vec<Track>,
    pub notes: Vec<String>,
}

/// Run `sorter` and wrap its output
pub fn sort(
    sorter: &dyn Sorter,
    tracks: &[Track],
    options: &SortOptions,
    cancel: &Cancellation,
) -> Result<SortResult, SequenceError> {
    let ordered = sorter.sort(tracks, options, cancel)?;

    let mut notes = Vec::new();
    if ordered.len() < tracks.len() {
        notes.push(format!(
            "kept {} of {} input tracks",
            ordered.len(),
            tracks.len()
        ));
    }

    Ok(SortResult {
        strategy: sorter.name().to_string(),
        ordered,
        notes,
    })
}

/// Seed derived from the wall clock, used when the caller supplies none
pub fn time_seed() -> u64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros()) as u64
}

pub type SorterFactory = Box<dyn Fn() -> Box<dyn Sorter> + Send + Sync>;

/// Name -> factory lookup used to pick a strategy at runtime
pub struct StrategyRegistry {
    factories: HashMap<String, SorterFactory>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(DEFAULT_STRATEGY_NAME, || Box::new(HarmonicSorter::new()));
        registry
    }
}

impl StrategyRegistry {
    /// Add or replace a strategy
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Sorter> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn get(&self, name: &str) -> Result<Box<dyn Sorter>, SequenceError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| SequenceError::UnknownStrategy(name.to_string()))
    }

    /// Registered names, sorted for help output
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
