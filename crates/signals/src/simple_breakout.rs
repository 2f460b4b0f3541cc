use crate::{Evaluation, EvaluationInput, Predicate};
use scanner_core::MatchDetails;

/// Volume-confirmed breakout: volume above average and close above the
/// previous close.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleBreakout;

impl Predicate for SimpleBreakout {
    fn name(&self) -> &str {
        "simple_breakout"
    }

    fn evaluate(&self, input: &EvaluationInput) -> Evaluation {
        let details = MatchDetails {
            price: input.latest_close,
            previous_price: input.previous_close,
            volume: input.latest_volume,
            average_volume: input.average_volume,
            ..Default::default()
        };

        let matched = match (
            input.latest_close,
            input.previous_close,
            input.latest_volume,
            input.average_volume,
        ) {
            (Some(price), Some(prev), Some(vol), Some(avg_vol)) => vol > avg_vol && price > prev,
            _ => false,
        };

        Evaluation { matched, details }
    }
}
