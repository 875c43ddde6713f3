use serde::Serialize;

use crate::models::Track;

use super::stats::MixStats;
use super::transitions::Transition;

/// Penalty breakdown for a finished sequence; lower totals are better
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MixEvaluation {
    pub total: f64,
    pub key_penalty: f64,
    pub bpm_penalty: f64,
    pub energy_penalty: f64,
    pub wraps: usize,
    pub big_jumps: usize,
    pub invalid_transitions: usize,
    pub energy_resets: usize,
    pub max_bpm_jump: f64,
}

/// Descriptive statistics of a finished sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MixSummary {
    pub total_tracks: usize,
    pub artist_count: usize,
    pub average_bpm: f64,
    pub bpm_range: (f64, f64),
    pub energy_range: (u8, u8),
    pub energy_quartiles: (f64, f64, f64),
}

/// Everything the CLI reports about a run
#[derive(Debug, Clone, Serialize)]
pub struct MixReport {
    pub strategy: String,
    pub seed: u64,
    pub generated_at: String,
    pub summary: MixSummary,
    pub evaluation: MixEvaluation,
    pub tracks: Vec<Track>,
}

/// Score a sequence the way a DJ would judge the transitions
pub fn evaluate_sequence(tracks: &[Track]) -> MixEvaluation {
    let mut score = MixEvaluation::default();
    if tracks.len() <= 1 {
        return score;
    }

    let mut since_reset = 0usize;

    for pair in tracks.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let trans = Transition::between(prev, next);

        if trans.wrap {
            score.wraps += 1;
            since_reset = 0;
        }

        match trans.diff {
            0 => score.key_penalty += 3.0,
            1 if trans.mode_change => {
                score.key_penalty += 4.0;
                score.invalid_transitions += 1;
            }
            2 if trans.mode_change => {
                score.key_penalty += 6.0;
                score.invalid_transitions += 1;
            }
            1 | 2 => {}
            3 => {
                score.key_penalty += 4.0;
                score.big_jumps += 1;
                if trans.mode_change {
                    score.key_penalty += 6.0;
                    score.invalid_transitions += 1;
                }
            }
            diff => {
                score.key_penalty += f64::from(diff) * f64::from(diff);
                score.big_jumps += 1;
                score.invalid_transitions += 1;
            }
        }

        if trans.wrap && trans.diff > 2 {
            score.key_penalty += 3.0;
        }

        let bpm_delta = (next.bpm - prev.bpm).abs();
        score.max_bpm_jump = score.max_bpm_jump.max(bpm_delta);
        if bpm_delta > 3.0 {
            score.bpm_penalty += (bpm_delta - 3.0) * 0.4;
        }

        let energy_delta = f64::from(next.energy) - f64::from(prev.energy);
        if energy_delta <= -10.0 {
            score.energy_resets += 1;
        }
        if energy_delta > 14.0 {
            score.energy_penalty += (energy_delta - 14.0) * 0.3;
        } else if energy_delta < -12.0 {
            // Strong resets after a climb are rewarded
            score.energy_penalty -= ((-energy_delta - 12.0) * 0.25).min(4.0);
            since_reset = 0;
        }

        since_reset += 1;
        if since_reset > 12 && energy_delta >= 0.0 {
            score.energy_penalty += 0.5;
        }
    }

    score.total = score.key_penalty * 0.6 + score.bpm_penalty * 0.2 + score.energy_penalty * 0.2;
    score
}

pub fn summarize(tracks: &[Track]) -> MixSummary {
    if tracks.is_empty() {
        return MixSummary::default();
    }

    let stats = MixStats::analyze(tracks);
    let average_bpm = stats.bpm_sorted.iter().sum::<f64>() / stats.bpm_sorted.len() as f64;

    let artist_count = tracks
        .iter()
        .map(|t| t.artist.to_lowercase())
        .collect::<std::collections::HashSet<_>>()
        .len();

    let first_last = |sorted: &[f64]| (sorted[0], sorted[sorted.len() - 1]);
    let energy_range = (stats.energy_sorted[0], stats.energy_sorted[stats.energy_sorted.len() - 1]);

    MixSummary {
        total_tracks: tracks.len(),
        artist_count,
        average_bpm,
        bpm_range: first_last(&stats.bpm_sorted),
        energy_range,
        energy_quartiles: (stats.energy_low, stats.energy_median, stats.energy_high),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Key, Mode};
    use approx::assert_relative_eq;

    fn track(number: u8, mode: Mode, bpm: f64, energy: u8) -> Track {
        Track::new("t", "a", bpm, energy, Key::new(number, mode).unwrap())
    }

    #[test]
    fn test_short_sequences_score_zero() {
        assert_eq!(evaluate_sequence(&[]), MixEvaluation::default());
        assert_eq!(evaluate_sequence(&[track(1, Mode::A, 120.0, 50)]), MixEvaluation::default());
    }

    #[test]
    fn test_smooth_steps_are_free() {
        let tracks = vec![
            track(1, Mode::A, 120.0, 50),
            track(2, Mode::A, 121.0, 55),
            track(4, Mode::A, 122.0, 60),
        ];
        let score = evaluate_sequence(&tracks);
        assert_relative_eq!(score.total, 0.0, epsilon = 1e-9);
        assert_eq!(score.invalid_transitions, 0);
        assert_relative_eq!(score.max_bpm_jump, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_penalises_bad_transitions() {
        let tracks = vec![
            track(1, Mode::A, 120.0, 50),
            // diff 1 with a mode change: invalid
            track(2, Mode::B, 120.0, 50),
            // diff 5: big jump, invalid
            track(7, Mode::B, 126.0, 70),
            // wrap 7 -> 2 (diff 7) with a strong energy reset
            track(2, Mode::B, 126.0, 40),
        ];
        let score = evaluate_sequence(&tracks);

        assert_eq!(score.invalid_transitions, 3);
        assert_eq!(score.big_jumps, 2);
        assert_eq!(score.wraps, 1);
        assert_eq!(score.energy_resets, 1);
        assert_relative_eq!(score.key_penalty, 4.0 + 25.0 + 49.0 + 3.0, epsilon = 1e-9);
        assert_relative_eq!(score.bpm_penalty, 1.2, epsilon = 1e-9);
        assert_relative_eq!(score.energy_penalty, 1.8 - 4.0, epsilon = 1e-9);
        assert_relative_eq!(score.max_bpm_jump, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_summarize() {
        let mut tracks = vec![
            track(1, Mode::A, 120.0, 40),
            track(2, Mode::A, 124.0, 80),
            track(3, Mode::A, 122.0, 60),
        ];
        tracks[1].artist = "Other".to_string();

        let summary = summarize(&tracks);
        assert_eq!(summary.total_tracks, 3);
        assert_eq!(summary.artist_count, 2);
        assert_relative_eq!(summary.average_bpm, 122.0, epsilon = 1e-9);
        assert_eq!(summary.bpm_range, (120.0, 124.0));
        assert_eq!(summary.energy_range, (40, 80));
        assert_eq!(summary.energy_quartiles, (50.0, 60.0, 70.0));

        assert_eq!(summarize(&[]), MixSummary::default());
    }
}
