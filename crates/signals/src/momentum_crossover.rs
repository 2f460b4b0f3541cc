use crate::{Evaluation, EvaluationInput, Predicate};
use scanner_core::MatchDetails;

/// Oversold momentum entry.
///
/// Matches when RSI is below `rsi_below`, the MACD line is above its signal
/// line, the close is above the moving average, and volume is above average.
#[derive(Debug, Clone)]
pub struct MomentumCrossover {
    rsi_below: f64,
}

impl Default for MomentumCrossover {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl MomentumCrossover {
    pub fn new(rsi_below: f64) -> Self {
        Self { rsi_below }
    }

    pub fn rsi_below(&self) -> f64 {
        self.rsi_below
    }
}

impl Predicate for MomentumCrossover {
    fn name(&self) -> &str {
        "momentum_crossover"
    }

    fn evaluate(&self, input: &EvaluationInput) -> Evaluation {
        let s = &input.snapshot;
        let details = MatchDetails {
            price: input.latest_close,
            volume: input.latest_volume,
            average_volume: input.average_volume,
            rsi: s.rsi,
            macd: s.macd,
            signal: s.macd_signal,
            ma: s.ma,
            ..Default::default()
        };

        let matched = match (
            s.rsi,
            s.macd,
            s.macd_signal,
            s.ma,
            input.latest_close,
            input.latest_volume,
            input.average_volume,
        ) {
            (Some(rsi), Some(macd), Some(signal), Some(ma), Some(price), Some(vol), Some(avg_vol)) => {
                rsi < self.rsi_below && macd > signal && price > ma && vol > avg_vol
            }
            _ => false,
        };

        Evaluation { matched, details }
    }
}
