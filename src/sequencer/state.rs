use crate::models::Track;

use super::transitions::{ENERGY_DROP_THRESHOLD, Transition};

const STEPS_SINCE_CAP: u32 = 100;

/// Where the planner currently sits within the energy cycle, plus the
/// variety counters that steer category ordering.
#[derive(Debug, Clone)]
pub struct MixState {
    pub prev: Option<Track>,
    pub cycle_index: usize,
    pub tracks_in_cycle: usize,
    pub cycle_start_energy: f64,
    pub desired_cycle_len: usize,
    pub same_number_streak: u32,
    pub steps_since_step1: u32,
    pub steps_since_step2: u32,
    pub steps_since_mode_flip: u32,
    pub steps_since_energy_drop: u32,
}

impl MixState {
    pub fn new(desired_cycle_len: usize) -> Self {
        Self {
            prev: None,
            cycle_index: 0,
            tracks_in_cycle: 0,
            cycle_start_energy: 0.0,
            desired_cycle_len,
            same_number_streak: 0,
            steps_since_step1: 0,
            steps_since_step2: 0,
            steps_since_mode_flip: 0,
            steps_since_energy_drop: 0,
        }
    }

    pub fn transition_to(&self, candidate: &Track) -> Transition {
        match &self.prev {
            Some(prev) => Transition::between(prev, candidate),
            None => Transition::default(),
        }
    }

    /// Record `next` as the newly placed track
    pub fn advance(&mut self, next: &Track) {
        let Some(previous) = self.prev.replace(next.clone()) else {
            self.cycle_start_energy = f64::from(next.energy);
            self.tracks_in_cycle = 1;
            self.same_number_streak = 0;
            self.steps_since_step1 = 0;
            self.steps_since_step2 = 0;
            self.steps_since_mode_flip = 0;
            self.steps_since_energy_drop = 0;
            return;
        };

        let trans = Transition::between(&previous, next);

        if trans.wrap {
            self.cycle_index += 1;
            self.tracks_in_cycle = 1;
            self.cycle_start_energy = f64::from(next.energy);
        } else {
            self.tracks_in_cycle += 1;
        }

        if trans.diff == 0 {
            self.same_number_streak += 1;
        } else {
            self.same_number_streak = 0;
        }

        for counter in [
            &mut self.steps_since_step1,
            &mut self.steps_since_step2,
            &mut self.steps_since_mode_flip,
            &mut self.steps_since_energy_drop,
        ] {
            *counter = (*counter + 1).min(STEPS_SINCE_CAP);
        }

        if trans.diff == 1 {
            self.steps_since_step1 = 0;
        }
        if trans.diff == 2 {
            self.steps_since_step2 = 0;
        }
        if trans.mode_change {
            self.steps_since_mode_flip = 0;
        }
        if i32::from(previous.energy) - i32::from(next.energy) >= ENERGY_DROP_THRESHOLD {
            self.steps_since_energy_drop = 0;
        }
    }
}
