use anyhow::{Context, Result};

use crate::sequencer::DEFAULT_STRATEGY_NAME;

const DEFAULT_OUTPUT_SUFFIX: &str = "_sequenced";

/// Defaults loaded from environment variables; CLI flags take precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub strategy: String,
    pub seed: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub output_suffix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_STRATEGY_NAME.to_string(),
            seed: None,
            timeout_secs: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

/// Load settings from `.env` and the environment
pub fn load_config() -> Result<Settings> {
    dotenv::dotenv().ok();
    settings_from(|name| std::env::var(name).ok())
}

fn settings_from<F>(lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    if let Some(strategy) = non_empty(lookup("HARMONIC_STRATEGY")) {
        settings.strategy = strategy;
    }
    if let Some(seed) = non_empty(lookup("HARMONIC_SEED")) {
        let seed: u64 = seed.parse().context("HARMONIC_SEED must be an integer")?;
        // 0 asks for a time-based seed
        settings.seed = (seed != 0).then_some(seed);
    }
    if let Some(timeout) = non_empty(lookup("HARMONIC_TIMEOUT_SECS")) {
        let timeout: u64 = timeout
            .parse()
            .context("HARMONIC_TIMEOUT_SECS must be a whole number of seconds")?;
        settings.timeout_secs = (timeout > 0).then_some(timeout);
    }
    if let Some(suffix) = non_empty(lookup("HARMONIC_OUTPUT_SUFFIX")) {
        settings.output_suffix = suffix;
    }

    Ok(settings)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
