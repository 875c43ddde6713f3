use crate::models::Track;

pub const CYCLE_MIN_TRACKS: usize = 6;
pub const CYCLE_MAX_TRACKS: usize = 10;
pub const CYCLE_IDEAL_TRACKS: usize = 8;

/// Distribution of energy and BPM across the whole input set.
/// Computed once before planning and never refreshed mid-run.
#[derive(Debug, Clone, Default)]
pub struct MixStats {
    pub energy_sorted: Vec<u8>,
    pub bpm_sorted: Vec<f64>,
    pub energy_low: f64,
    pub energy_median: f64,
    pub energy_high: f64,
    pub bpm_median: f64,
}

impl MixStats {
    pub fn analyze(tracks: &[Track]) -> Self {
        let mut energy_sorted: Vec<u8> = tracks.iter().map(|t| t.energy).collect();
        let mut bpm_sorted: Vec<f64> = tracks.iter().map(|t| t.bpm).collect();
        energy_sorted.sort_unstable();
        bpm_sorted.sort_by(f64::total_cmp);

        let energies: Vec<f64> = energy_sorted.iter().map(|&e| f64::from(e)).collect();

        Self {
            energy_low: quantile(&energies, 0.25),
            energy_median: quantile(&energies, 0.5),
            energy_high: quantile(&energies, 0.75),
            bpm_median: quantile(&bpm_sorted, 0.5),
            energy_sorted,
            bpm_sorted,
        }
    }
}

/// Linear-interpolated quantile of an already sorted slice
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let Some((&first, rest)) = sorted.split_first() else {
        return 0.0;
    };
    if q <= 0.0 || rest.is_empty() {
        return first;
    }
    if q >= 1.0 {
        return sorted[sorted.len() - 1];
    }

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Number of tracks an energy ramp should span before resetting
pub fn ideal_cycle_length(total: usize) -> usize {
    if total <= CYCLE_MIN_TRACKS {
        return if total == 0 { CYCLE_MIN_TRACKS } else { total };
    }

    let estimated_cycles = (total as f64 / CYCLE_IDEAL_TRACKS as f64).round().max(1.0);
    let length = (total as f64 / estimated_cycles).round() as usize;
    length.clamp(CYCLE_MIN_TRACKS, CYCLE_MAX_TRACKS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Key, Mode};
    use approx::assert_relative_eq;

    #[test]
    fn test_quantile_interpolates_between_ranks() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_relative_eq!(quantile(&values, 0.25), 17.5, epsilon = 1e-9);
        assert_relative_eq!(quantile(&values, 0.5), 25.0, epsilon = 1e-9);
        assert_relative_eq!(quantile(&values, 0.75), 32.5, epsilon = 1e-9);
        assert_relative_eq!(quantile(&values, 0.0), 10.0, epsilon = 1e-9);
        assert_relative_eq!(quantile(&values, 1.0), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quantile_of_degenerate_inputs() {
        assert_relative_eq!(quantile(&[], 0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(quantile(&[42.0], 0.75), 42.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ideal_cycle_length() {
        assert_eq!(ideal_cycle_length(0), CYCLE_MIN_TRACKS);
        assert_eq!(ideal_cycle_length(4), 4);
        assert_eq!(ideal_cycle_length(6), 6);
        assert_eq!(ideal_cycle_length(7), 7);
        assert_eq!(ideal_cycle_length(16), 8);
        // 13 tracks round to two cycles of 6.5 -> 7 (round half away from zero)
        assert_eq!(ideal_cycle_length(13), 7);
        assert_eq!(ideal_cycle_length(100), 8);
        // 11 tracks estimate one cycle, clamped to the maximum
        assert_eq!(ideal_cycle_length(11), CYCLE_MAX_TRACKS);
    }

    #[test]
    fn test_analyze_uses_full_input() {
        let key = Key::new(1, Mode::A).unwrap();
        let tracks: Vec<Track> = [(120.0, 40), (122.0, 80), (121.0, 60), (130.0, 50)]
            .into_iter()
            .map(|(bpm, energy)| Track::new("t", "a", bpm, energy, key))
            .collect();

        let stats = MixStats::analyze(&tracks);
        assert_eq!(stats.energy_sorted, vec![40, 50, 60, 80]);
        assert_relative_eq!(stats.energy_low, 47.5, epsilon = 1e-9);
        assert_relative_eq!(stats.energy_median, 55.0, epsilon = 1e-9);
        assert_relative_eq!(stats.energy_high, 65.0, epsilon = 1e-9);
        assert_relative_eq!(stats.bpm_median, 121.5, epsilon = 1e-9);
    }
}
