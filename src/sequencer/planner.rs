use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::models::{Key, Track};

use super::state::MixState;
use super::stats::{CYCLE_MIN_TRACKS, MixStats, ideal_cycle_length};
use super::transitions::{
    BPM_WEIGHT, Category, ENERGY_WEIGHT, KEY_WEIGHT, Transition, VARIETY_MODE_THRESHOLD,
    VARIETY_MODE_WEIGHT, VARIETY_STEP_THRESHOLD, VARIETY_STEP_WEIGHT, bpm_cost, category_order,
    energy_cost, key_cost,
};

const START_SELECTION_TOLERANCE: f64 = 1.0;
const TIE_EPSILON: f64 = 1e-6;
const SHALLOW_MAX_STEP: u8 = 2;

/// Best candidate seen so far within one category
#[derive(Debug, Clone, Copy)]
struct Choice {
    idx: usize,
    score: f64,
}

/// Owns the tracks still to be placed and the inventory counts derived from them.
pub struct MixPlanner {
    remaining: Vec<Track>,
    stats: MixStats,
    desired_cycle_length: usize,
    counts_by_key: HashMap<Key, usize>,
    counts_by_number: HashMap<u8, usize>,
    rng: StdRng,
    total_tracks: usize,
    target_count: usize,
}

impl MixPlanner {
    pub fn new(tracks: &[Track], target_count: usize, seed: u64) -> Self {
        let remaining = tracks.to_vec();
        let stats = MixStats::analyze(&remaining);

        let mut counts_by_key = HashMap::with_capacity(remaining.len());
        let mut counts_by_number = HashMap::with_capacity(remaining.len());
        for track in &remaining {
            *counts_by_key.entry(track.key).or_insert(0) += 1;
            *counts_by_number.entry(track.key.number).or_insert(0) += 1;
        }

        let desired_cycle_length = ideal_cycle_length(remaining.len());
        debug!(
            tracks = remaining.len(),
            target_count,
            desired_cycle_length,
            energy_low = stats.energy_low,
            energy_high = stats.energy_high,
            bpm_median = stats.bpm_median,
            "prepared mix planner"
        );

        Self {
            total_tracks: remaining.len(),
            remaining,
            stats,
            desired_cycle_length,
            counts_by_key,
            counts_by_number,
            rng: StdRng::seed_from_u64(seed),
            target_count,
        }
    }

    pub fn remaining_count(&self) -> usize {
        self.remaining.len()
    }

    pub fn desired_cycle_length(&self) -> usize {
        self.desired_cycle_length
    }

    fn count_for_number(&self, number: u8) -> usize {
        self.counts_by_number.get(&number).copied().unwrap_or(0)
    }

    fn count_for_key(&self, key: &Key) -> usize {
        self.counts_by_key.get(key).copied().unwrap_or(0)
    }

    /// Pick the opening track: deep key clusters first, energy near the low
    /// quartile, BPM near the median. Near-ties are broken at random.
    pub fn choose_start_index(&mut self) -> usize {
        let mut best_score = f64::INFINITY;
        let mut candidates: Vec<usize> = Vec::new();

        for (idx, candidate) in self.remaining.iter().enumerate() {
            let score = self.start_score(candidate);
            if score < best_score - START_SELECTION_TOLERANCE {
                best_score = score;
                candidates.clear();
                candidates.push(idx);
            } else if score <= best_score + START_SELECTION_TOLERANCE {
                candidates.push(idx);
            }
        }

        if candidates.is_empty() {
            return 0;
        }

        let pick = candidates[self.rng.gen_range(0..candidates.len())];
        debug!(
            candidates = candidates.len(),
            best_score, "chose opening track {}", self.remaining[pick].title
        );
        pick
    }

    pub fn start_score(&self, candidate: &Track) -> f64 {
        let number_count = self.count_for_number(candidate.key.number) as f64;
        let key_count = self.count_for_key(&candidate.key);

        let mut freq_score = -number_count * 6.0;
        if key_count > 1 {
            freq_score -= 1.0;
        }

        let energy_diff = (f64::from(candidate.energy) - self.stats.energy_low).abs();
        let bpm_diff = (candidate.bpm - self.stats.bpm_median).abs();

        freq_score + energy_diff * 0.2 + bpm_diff * 0.05
    }

    /// Choose the index of the next track to place after `state.prev`
    pub fn choose_next_index(&mut self, state: &MixState) -> usize {
        let mut buckets: [Option<Choice>; Category::COUNT] = [None; Category::COUNT];

        for idx in 0..self.remaining.len() {
            let candidate = &self.remaining[idx];
            let trans = state.transition_to(candidate);
            let score = self.transition_cost(state, candidate, trans);
            let category = Category::classify(state, trans);

            let slot = &mut buckets[category.index()];
            match slot {
                Some(best) if score < best.score - TIE_EPSILON => {
                    *best = Choice { idx, score };
                }
                Some(best) if (score - best.score).abs() <= TIE_EPSILON => {
                    if self.rng.gen_bool(0.5) {
                        *best = Choice { idx, score };
                    }
                }
                Some(_) => {}
                None => *slot = Some(Choice { idx, score }),
            }
        }

        for category in category_order(state) {
            if let Some(choice) = buckets[category.index()] {
                trace!(?category, score = choice.score, "selected category winner");
                return choice.idx;
            }
        }

        // Unreachable while tracks remain: Leap accepts every transition
        0
    }

    /// Scalar cost of moving from `state.prev` to `candidate`; lower is better
    pub fn transition_cost(&self, state: &MixState, candidate: &Track, trans: Transition) -> f64 {
        let key = key_cost(state, trans);
        let energy = energy_cost(state, candidate, trans, &self.stats);
        let bpm = bpm_cost(state, candidate, &self.stats);

        let remaining_for_number = self.count_for_number(candidate.key.number) as f64;
        let flex = if remaining_for_number > 0.0 {
            1.0 / remaining_for_number
        } else {
            0.0
        };

        let mut total = key * KEY_WEIGHT + bpm * BPM_WEIGHT + energy * ENERGY_WEIGHT + flex;

        let coverage = if self.total_tracks > 0 {
            (self.target_count as f64 / self.total_tracks as f64).clamp(0.1, 1.0)
        } else {
            1.0
        };

        let prev_number_count = state
            .prev
            .as_ref()
            .map_or(0.0, |prev| self.count_for_number(prev.key.number) as f64);

        if let Some(prev) = &state.prev {
            // Drain the current cluster before moving away from it
            if trans.diff > 0 {
                total += prev_number_count * 0.5 * coverage;
                total += self.count_for_key(&prev.key) as f64 * coverage;
            }

            if trans.diff >= 3 && self.has_shallow_step_option(state) {
                total += f64::from((trans.diff - 2) * 8) + 18.0;
            }

            total += variety_adjustment(state, trans);
        }

        // Moving into a deep cluster consumes it sooner
        let base_weight = 0.6 * coverage;
        total -= remaining_for_number * base_weight;
        total -= self.count_for_key(&candidate.key) as f64 * base_weight;

        if trans.wrap && trans.diff > 2 {
            if state.tracks_in_cycle < CYCLE_MIN_TRACKS {
                total += 7.0;
            }
            total += prev_number_count * 2.0;
        }

        if state.prev.is_some() && trans.diff == 0 {
            total += f64::from(state.same_number_streak + 1) * 6.0;
        }

        total
    }

    /// Whether any remaining track can be reached without a big jump
    pub fn has_shallow_step_option(&self, state: &MixState) -> bool {
        if state.prev.is_none() {
            return true;
        }
        self.remaining
            .iter()
            .any(|candidate| state.transition_to(candidate).is_shallow(SHALLOW_MAX_STEP))
    }

    /// Remove and return the track at `idx`, keeping inventory counts aligned
    pub fn take(&mut self, idx: usize) -> Track {
        let selected = self.remaining.swap_remove(idx);

        if let Some(count) = self.counts_by_key.get_mut(&selected.key) {
            *count -= 1;
            if *count == 0 {
                self.counts_by_key.remove(&selected.key);
            }
        }
        if let Some(count) = self.counts_by_number.get_mut(&selected.key.number) {
            *count -= 1;
            if *count == 0 {
                self.counts_by_number.remove(&selected.key.number);
            }
        }

        selected
    }
}

/// Bonuses for transition types that have been missing for a while, and
/// penalties for leaning on the same one.
fn variety_adjustment(state: &MixState, trans: Transition) -> f64 {
    let s1 = state.steps_since_step1;
    let s2 = state.steps_since_step2;
    let flip = state.steps_since_mode_flip;
    let mut adjustment = 0.0;

    match trans.diff {
        1 => {
            if s1 >= VARIETY_STEP_THRESHOLD {
                adjustment -= f64::from(s1 - VARIETY_STEP_THRESHOLD + 1) * VARIETY_STEP_WEIGHT;
            }
            if s2 > VARIETY_STEP_THRESHOLD {
                adjustment += f64::from(s2 - VARIETY_STEP_THRESHOLD) * VARIETY_STEP_WEIGHT * 0.7;
            }
        }
        2 => {
            if s2 >= VARIETY_STEP_THRESHOLD {
                adjustment -= f64::from(s2 - VARIETY_STEP_THRESHOLD + 1) * VARIETY_STEP_WEIGHT;
            }
            if s1 > VARIETY_STEP_THRESHOLD {
                adjustment += f64::from(s1 - VARIETY_STEP_THRESHOLD) * VARIETY_STEP_WEIGHT * 0.7;
            }
        }
        0 if trans.mode_change && flip >= VARIETY_MODE_THRESHOLD => {
            adjustment -= f64::from(flip - VARIETY_MODE_THRESHOLD + 1) * VARIETY_MODE_WEIGHT;
        }
        _ => {}
    }

    adjustment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mode;
    use approx::assert_relative_eq;

    fn track(title: &str, number: u8, mode: Mode, bpm: f64, energy: u8) -> Track {
        Track::new(title, "artist", bpm, energy, Key::new(number, mode).unwrap())
    }

    #[test]
    fn test_take_updates_inventory() {
        let tracks = vec![
            track("a", 4, Mode::A, 124.0, 50),
            track("b", 4, Mode::B, 124.0, 50),
            track("c", 5, Mode::A, 124.0, 50),
        ];
        let mut planner = MixPlanner::new(&tracks, 3, 7);
        assert_eq!(planner.count_for_number(4), 2);

        let taken = planner.take(0);
        assert_eq!(taken.title, "a");
        assert_eq!(planner.remaining_count(), 2);
        assert_eq!(planner.count_for_number(4), 1);
        assert_eq!(planner.count_for_key(&Key::new(4, Mode::A).unwrap()), 0);
        assert!(!planner.counts_by_key.contains_key(&Key::new(4, Mode::A).unwrap()));

        planner.take(0);
        planner.take(0);
        assert!(planner.counts_by_number.is_empty());
        assert!(planner.counts_by_key.is_empty());
    }

    #[test]
    fn test_start_score_prefers_deep_clusters() {
        let tracks = vec![
            track("lonely", 9, Mode::A, 124.0, 50),
            track("deep 1", 2, Mode::A, 124.0, 50),
            track("deep 2", 2, Mode::A, 124.0, 50),
            track("deep 3", 2, Mode::B, 124.0, 50),
        ];
        let planner = MixPlanner::new(&tracks, 4, 1);

        let lonely = planner.start_score(&tracks[0]);
        let deep = planner.start_score(&tracks[1]);
        let deep_other_mode = planner.start_score(&tracks[3]);

        assert_relative_eq!(lonely, -6.0, epsilon = 1e-9);
        assert_relative_eq!(deep, -19.0, epsilon = 1e-9);
        assert_relative_eq!(deep_other_mode, -18.0, epsilon = 1e-9);
    }

    #[test]
    fn test_choose_start_index_stays_within_tolerance() {
        let tracks = vec![
            track("lonely", 9, Mode::A, 124.0, 50),
            track("deep 1", 2, Mode::A, 124.0, 50),
            track("deep 2", 2, Mode::A, 124.0, 50),
            track("deep 3", 2, Mode::B, 124.0, 50),
        ];

        for seed in 0..20 {
            let mut planner = MixPlanner::new(&tracks, 4, seed);
            let idx = planner.choose_start_index();
            assert!(idx >= 1, "seed {seed} opened on the stranded key");
        }
    }

    #[test]
    fn test_shallow_option_detection() {
        let tracks = vec![
            track("far", 9, Mode::A, 124.0, 50),
            track("flip", 4, Mode::B, 124.0, 50),
        ];
        let planner = MixPlanner::new(&tracks, 2, 1);

        let mut state = MixState::new(6);
        assert!(planner.has_shallow_step_option(&state));

        state.advance(&track("prev", 3, Mode::A, 124.0, 50));
        assert!(!planner.has_shallow_step_option(&state));

        let tracks = vec![track("hold flip", 3, Mode::B, 124.0, 50)];
        let planner = MixPlanner::new(&tracks, 1, 1);
        assert!(planner.has_shallow_step_option(&state));
    }

    #[test]
    fn test_big_jump_penalised_when_shallow_option_exists() {
        let tracks = vec![
            track("step", 4, Mode::A, 124.0, 50),
            track("jump", 8, Mode::A, 124.0, 50),
        ];
        let planner = MixPlanner::new(&tracks, 2, 1);
        let mut state = MixState::new(6);
        state.advance(&track("prev", 3, Mode::A, 124.0, 50));

        let jump = &tracks[1];
        let with_option = planner.transition_cost(&state, jump, state.transition_to(jump));

        let alone = vec![jump.clone()];
        let planner = MixPlanner::new(&alone, 1, 1);
        let without_option = planner.transition_cost(&state, jump, state.transition_to(jump));

        // diff 5: 3 * 8 + 18 extra when a shallow step was available
        assert_relative_eq!(with_option - without_option, 42.0, epsilon = 1e-9);
    }

    #[test]
    fn test_choose_next_prefers_step_one() {
        let tracks = vec![
            track("leap", 9, Mode::A, 124.0, 50),
            track("hold", 3, Mode::A, 124.0, 50),
            track("step", 4, Mode::A, 124.0, 52),
            track("flip", 3, Mode::B, 124.0, 50),
        ];
        let mut planner = MixPlanner::new(&tracks, 4, 3);
        let mut state = MixState::new(6);
        state.advance(&track("prev", 3, Mode::A, 124.0, 50));

        let idx = planner.choose_next_index(&state);
        assert_eq!(planner.remaining[idx].title, "step");
    }

    #[test]
    fn test_choose_next_promotes_overdue_mode_flip() {
        let tracks = vec![
            track("step", 4, Mode::A, 124.0, 52),
            track("flip", 3, Mode::B, 124.0, 50),
        ];
        let mut planner = MixPlanner::new(&tracks, 2, 3);
        let mut state = MixState::new(6);
        state.advance(&track("prev", 3, Mode::A, 124.0, 50));
        state.steps_since_mode_flip = VARIETY_MODE_THRESHOLD;

        let idx = planner.choose_next_index(&state);
        assert_eq!(planner.remaining[idx].title, "flip");
    }

    #[test]
    fn test_variety_adjustment() {
        let mut state = MixState::new(8);
        state.advance(&track("prev", 3, Mode::A, 124.0, 50));
        state.steps_since_step1 = 3;
        state.steps_since_step2 = 4;
        state.steps_since_mode_flip = 6;

        let step1 = Transition { diff: 1, wrap: false, mode_change: false };
        let step2 = Transition { diff: 2, wrap: false, mode_change: false };
        let flip = Transition { diff: 0, wrap: false, mode_change: true };
        let leap = Transition { diff: 5, wrap: false, mode_change: false };

        assert_relative_eq!(variety_adjustment(&state, step1), -6.0 + 2.0 * 2.1, epsilon = 1e-9);
        assert_relative_eq!(variety_adjustment(&state, step2), -9.0 + 2.1, epsilon = 1e-9);
        assert_relative_eq!(variety_adjustment(&state, flip), -5.0, epsilon = 1e-9);
        assert_relative_eq!(variety_adjustment(&state, leap), 0.0, epsilon = 1e-9);
    }
}
