pub mod evaluation;
pub mod generator;
pub mod planner;
pub mod state;
pub mod stats;
pub mod strategy;
pub mod transitions;

pub use evaluation::*;
pub use generator::*;
pub use strategy::*;

use thiserror::Error;

/// Failures surfaced by sequencing strategies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("sequencing cancelled")]
    Cancelled,
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}
