use crate::models::Track;

use super::state::MixState;
use super::stats::MixStats;

pub const KEY_WEIGHT: f64 = 12.0;
pub const BPM_WEIGHT: f64 = 0.8;
pub const ENERGY_WEIGHT: f64 = 2.0;

pub const VARIETY_STEP_THRESHOLD: u32 = 2;
pub const VARIETY_STEP_WEIGHT: f64 = 3.0;
pub const VARIETY_MODE_THRESHOLD: u32 = 5;
pub const VARIETY_MODE_WEIGHT: f64 = 2.5;
pub const VARIETY_ENERGY_THRESHOLD: u32 = 5;
pub const VARIETY_ENERGY_REWARD: f64 = 1.5;
pub const VARIETY_ENERGY_PENALTY: f64 = 0.6;
pub const ENERGY_DROP_THRESHOLD: i32 = 10;

const ENERGY_COST_FLOOR: f64 = -5.0;

/// How one track moves to the next on the Camelot wheel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    /// Forward distance between key numbers, `0..=11`
    pub diff: u8,
    /// The forward path crossed the 12 -> 1 boundary
    pub wrap: bool,
    pub mode_change: bool,
}

impl Transition {
    pub fn between(prev: &Track, next: &Track) -> Self {
        Self {
            diff: prev.key.forward_distance(&next.key),
            wrap: next.key.number < prev.key.number,
            mode_change: prev.key.mode != next.key.mode,
        }
    }

    /// Shallow moves never need a big jump penalty: holding the number, or a
    /// one/two step forward in the same mode.
    pub fn is_shallow(&self, max_step: u8) -> bool {
        self.diff == 0 || (!self.mode_change && self.diff <= max_step)
    }
}

/// Coarse buckets in general order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    StepOne = 0,
    StepTwo = 1,
    Hold = 2,
    ModeFlip = 3,
    Leap = 4,
}

impl Category {
    pub const COUNT: usize = 5;

    pub const ALL: [Category; Self::COUNT] = [
        Category::StepOne,
        Category::StepTwo,
        Category::Hold,
        Category::ModeFlip,
        Category::Leap,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn classify(state: &MixState, trans: Transition) -> Self {
        if state.prev.is_none() {
            return Category::StepOne;
        }
        match (trans.diff, trans.mode_change) {
            (1, false) => Category::StepOne,
            (2, false) => Category::StepTwo,
            (0, false) => Category::Hold,
            (0, true) => Category::ModeFlip,
            _ => Category::Leap,
        }
    }
}

/// Order in which category winners are considered, shaped by the variety counters
pub fn category_order(state: &MixState) -> Vec<Category> {
    use Category::*;

    let mut order = Category::ALL.to_vec();
    if state.prev.is_none() {
        return order;
    }

    if state.steps_since_step2 >= VARIETY_STEP_THRESHOLD {
        order = vec![StepTwo, StepOne, Hold, ModeFlip, Leap];
    }

    if state.steps_since_mode_flip >= VARIETY_MODE_THRESHOLD {
        order.retain(|&c| c != ModeFlip);
        order.insert(0, ModeFlip);
    }

    order
}

pub fn key_cost(state: &MixState, trans: Transition) -> f64 {
    if state.prev.is_none() {
        return 0.0;
    }

    let diff = f64::from(trans.diff);
    let mut cost = match trans.diff {
        0 => 3.0,
        1 | 2 => 0.0,
        3 => 2.0,
        _ => diff * diff / 2.0,
    };

    if trans.mode_change && trans.diff > 0 {
        cost += 12.0;
    }

    if trans.wrap && trans.diff > 2 {
        // Relax as the cycle nears its desired length
        let mut penalty = 6.0;
        if state.tracks_in_cycle >= state.desired_cycle_len.saturating_sub(1) {
            penalty *= 0.4;
        } else if state.tracks_in_cycle >= state.desired_cycle_len.saturating_sub(2) {
            penalty *= 0.6;
        }
        cost += penalty;
    }

    cost
}

pub fn bpm_cost(state: &MixState, candidate: &Track, stats: &MixStats) -> f64 {
    let Some(prev) = &state.prev else {
        return (candidate.bpm - stats.bpm_median).abs() / 6.0;
    };

    let diff = (candidate.bpm - prev.bpm).abs();
    if diff <= 1.0 {
        diff * 0.2
    } else if diff <= 2.5 {
        diff * 0.4
    } else if diff <= 5.0 {
        0.8 + (diff - 2.5) * 0.5
    } else {
        2.0 + (diff - 5.0) * 0.7
    }
}

pub fn energy_cost(state: &MixState, candidate: &Track, trans: Transition, stats: &MixStats) -> f64 {
    let energy = f64::from(candidate.energy);
    let Some(prev) = &state.prev else {
        return (energy - stats.energy_low).abs() / 8.0;
    };

    let delta = energy - f64::from(prev.energy);
    let drop = -delta;

    let mut cost = if trans.wrap {
        let mut cost = (energy - stats.energy_low).abs() / 6.0;
        if drop < 12.0 {
            cost += (12.0 - drop) / 6.0;
        }
        cost
    } else {
        let target = next_energy_target(state, stats);
        let mut cost = (energy - target).abs() / 9.0;
        if delta < 0.0 {
            if state.tracks_in_cycle > state.desired_cycle_len / 2 {
                cost += delta.abs() / 10.0;
            } else {
                cost += delta.abs() / 6.0;
            }
        } else if delta > 12.0 {
            cost += (delta - 12.0) / 8.0;
        }
        cost
    };

    let since_drop = state.steps_since_energy_drop;
    let drop_threshold = f64::from(ENERGY_DROP_THRESHOLD);
    if drop >= drop_threshold && since_drop >= VARIETY_ENERGY_THRESHOLD {
        cost -= f64::from(since_drop - VARIETY_ENERGY_THRESHOLD + 1) * VARIETY_ENERGY_REWARD;
    } else if drop < drop_threshold && since_drop >= VARIETY_ENERGY_THRESHOLD + 2 {
        cost += f64::from(since_drop - (VARIETY_ENERGY_THRESHOLD + 1)) * VARIETY_ENERGY_PENALTY;
    }

    cost.max(ENERGY_COST_FLOOR)
}

/// Energy the cycle should have reached by now: interpolated from the cycle's
/// opening energy toward the dataset's upper quartile.
pub fn next_energy_target(state: &MixState, stats: &MixStats) -> f64 {
    let base = state.cycle_start_energy;
    let mut high = stats.energy_high;
    if high <= base {
        high = (base + 12.0).min(100.0);
    }

    let progress =
        (state.tracks_in_cycle as f64 / state.desired_cycle_len.max(1) as f64).min(1.0);

    base + (high - base) * progress
}
