pub mod momentum_crossover;
pub mod simple_breakout;
pub mod snapshot;

pub use momentum_crossover::MomentumCrossover;
pub use simple_breakout::SimpleBreakout;
pub use snapshot::{compute_snapshot, EvaluationInput};

use scanner_core::{MatchDetails, PredicateConfig, PredicateVariant};

/// Result of applying a predicate to one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub matched: bool,
    /// The values the predicate looked at.
    pub details: MatchDetails,
}

/// An entry condition over indicator and raw values.
///
/// Implementations must be pure: the same input always yields the same
/// evaluation. A missing value never errors, it just fails the condition.
pub trait Predicate: Send + Sync {
    /// Stable identifier, e.g. `momentum_crossover`.
    fn name(&self) -> &str;

    fn evaluate(&self, input: &EvaluationInput) -> Evaluation;
}

/// Build the predicate selected by configuration.
pub fn build_predicate(config: &PredicateConfig) -> Box<dyn Predicate> {
    match config.variant {
        PredicateVariant::MomentumCrossover => Box::new(MomentumCrossover::new(config.rsi_below)),
        PredicateVariant::SimpleBreakout => Box::new(SimpleBreakout),
    }
}
