use crate::ema::Ema;
use crate::Indicator;
use serde::{Deserialize, Serialize};

/// MACD (Moving Average Convergence Divergence).
///
/// Composed of three EMAs:
/// - Fast EMA (default 12), skipping the first `slow - fast` inputs so it
///   seeds on the same input as the slow EMA
/// - Slow EMA (default 26)
/// - Signal EMA (default 9), fed with the MACD line once both EMAs are seeded
///
/// The MACD line exists from input `slow`, the signal line from input
/// `slow + signal - 1`. Values agree with TA-Lib's `MACD`.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_ema: Ema,
    slow_ema: Ema,
    signal_ema: Ema,
    macd_line: Option<f64>,
    signal_line: Option<f64>,
}

/// MACD output with all three components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        assert!(fast_period < slow_period, "Fast period must be less than slow period");
        Self {
            fast_ema: Ema::with_offset(fast_period, slow_period - fast_period),
            slow_ema: Ema::new(slow_period),
            signal_ema: Ema::new(signal_period),
            macd_line: None,
            signal_line: None,
        }
    }

    /// Standard MACD (12, 26, 9).
    pub fn default_periods() -> Self {
        Self::new(12, 26, 9)
    }

    /// The MACD line alone, available before the signal line is.
    pub fn macd_line(&self) -> Option<f64> {
        self.macd_line
    }

    /// Returns the full MACD output (macd, signal, histogram) if ready.
    pub fn output(&self) -> Option<MacdOutput> {
        match (self.macd_line, self.signal_line) {
            (Some(macd), Some(signal)) => Some(MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            }),
            _ => None,
        }
    }

    /// Process next value and return full output if ready.
    pub fn next_output(&mut self, value: f64) -> Option<MacdOutput> {
        let fast = self.fast_ema.next(value);
        let slow = self.slow_ema.next(value);

        if let (Some(f), Some(s)) = (fast, slow) {
            let macd = f - s;
            self.macd_line = Some(macd);
            self.signal_line = self.signal_ema.next(macd);
        }

        self.output()
    }
}

impl Indicator for Macd {
    fn next(&mut self, value: f64) -> Option<f64> {
        self.next_output(value).map(|o| o.macd)
    }

    fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.signal_ema.reset();
        self.macd_line = None;
        self.signal_line = None;
    }

    fn period(&self) -> usize {
        self.slow_ema.period() + self.signal_ema.period() - 1
    }

    fn is_ready(&self) -> bool {
        self.signal_line.is_some()
    }
}
