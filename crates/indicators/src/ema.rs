use crate::Indicator;

/// Exponential moving average, seeded with the simple mean of its first
/// `period` inputs and smoothed with `2 / (period + 1)` afterwards.
///
/// An offset makes the average ignore that many leading inputs before it
/// starts collecting its seed. MACD uses this to seed its fast and slow
/// averages on the same candle.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    offset: usize,
    alpha: f64,
    seen: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self::with_offset(period, 0)
    }

    /// An EMA that skips the first `offset` inputs.
    pub fn with_offset(period: usize, offset: usize) -> Self {
        assert!(period > 0, "EMA period must be > 0");
        Self {
            period,
            offset,
            alpha: 2.0 / (period as f64 + 1.0),
            seen: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Indicator for Ema {
    fn next(&mut self, input: f64) -> Option<f64> {
        self.seen += 1;
        if self.seen <= self.offset {
            return None;
        }

        self.value = match self.value {
            Some(prev) => Some(prev + self.alpha * (input - prev)),
            None => {
                self.seed_sum += input;
                (self.seen == self.offset + self.period)
                    .then(|| self.seed_sum / self.period as f64)
            }
        };
        self.value
    }

    fn reset(&mut self) {
        self.seen = 0;
        self.seed_sum = 0.0;
        self.value = None;
    }

    /// Inputs consumed before the first value, offset included.
    fn period(&self) -> usize {
        self.offset + self.period
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }
}
