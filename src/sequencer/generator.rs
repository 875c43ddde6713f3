use tracing::{debug, info};

use crate::cancel::Cancellation;
use crate::models::Track;

use super::planner::MixPlanner;
use super::state::MixState;
use super::strategy::{SortOptions, Sorter, time_seed};
use super::SequenceError;

pub const DEFAULT_STRATEGY_NAME: &str = "default";

/// Greedy harmonic sequencer: walks the Camelot wheel forward in small steps,
/// ramps energy through each cycle, and resets energy when the wheel wraps.
#[derive(Debug, Default)]
pub struct HarmonicSorter;

impl HarmonicSorter {
    pub fn new() -> Self {
        Self
    }
}

impl Sorter for HarmonicSorter {
    fn name(&self) -> &'static str {
        DEFAULT_STRATEGY_NAME
    }

    fn sort(
        &self,
        tracks: &[Track],
        options: &SortOptions,
        cancel: &Cancellation,
    ) -> Result<Vec<Track>, SequenceError> {
        if tracks.len() <= 1 {
            return Ok(tracks.to_vec());
        }

        let target_count = match options.limit {
            Some(limit) if limit > 0 && limit < tracks.len() => limit,
            _ => tracks.len(),
        };
        let seed = options.seed.unwrap_or_else(time_seed);

        let mut planner = MixPlanner::new(tracks, target_count, seed);
        let mut state = MixState::new(planner.desired_cycle_length());
        let mut ordered = Vec::with_capacity(target_count);

        let start_idx = planner.choose_start_index();
        let start = planner.take(start_idx);
        state.advance(&start);
        ordered.push(start);

        while planner.remaining_count() > 0 && ordered.len() < target_count {
            cancel.check()?;

            let idx = planner.choose_next_index(&state);
            let next = planner.take(idx);
            state.advance(&next);
            debug!(
                position = ordered.len(),
                key = %next.key,
                energy = next.energy,
                cycle = state.cycle_index,
                "placed {}",
                next.title
            );
            ordered.push(next);
        }

        info!(
            placed = ordered.len(),
            cycles = state.cycle_index + 1,
            "harmonic sequencing complete"
        );
        Ok(ordered)
    }
}
