use crate::Indicator;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How average gain/loss are carried forward after the first full window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSmoothing {
    /// Seed with the simple mean of the first `period` changes, then
    /// `avg = (prev * (period - 1) + x) / period`.
    #[default]
    Wilder,
    /// Plain rolling mean of the trailing `period` changes.
    Simple,
}

/// Relative Strength Index (RSI).
#[derive(Debug, Clone)]
pub struct Rsi {
    len: usize,
    smoothing: RsiSmoothing,
    prev_value: Option<f64>,
    gains: VecDeque<f64>,
    losses: VecDeque<f64>,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
}

impl Rsi {
    /// RSI with Wilder smoothing.
    pub fn new(period: usize) -> Self {
        Self::with_smoothing(period, RsiSmoothing::Wilder)
    }

    pub fn with_smoothing(period: usize, smoothing: RsiSmoothing) -> Self {
        assert!(period > 0, "RSI period must be > 0");
        Self {
            len: period,
            smoothing,
            prev_value: None,
            gains: VecDeque::with_capacity(period + 1),
            losses: VecDeque::with_capacity(period + 1),
            avg_gain: None,
            avg_loss: None,
        }
    }

    pub fn smoothing(&self) -> RsiSmoothing {
        self.smoothing
    }

    /// Current RSI. A window with neither gains nor losses reads as 50;
    /// TA-Lib's `RSI` reports 0 for the same flat window.
    pub fn value(&self) -> Option<f64> {
        match (self.avg_gain, self.avg_loss) {
            (Some(ag), Some(al)) => {
                if al <= 0.0 {
                    if ag <= 0.0 {
                        Some(50.0)
                    } else {
                        Some(100.0)
                    }
                } else {
                    let rs = ag / al;
                    Some(100.0 - 100.0 / (1.0 + rs))
                }
            }
            _ => None,
        }
    }

    fn window_means(&self) -> (f64, f64) {
        let n = self.len as f64;
        (
            self.gains.iter().sum::<f64>() / n,
            self.losses.iter().sum::<f64>() / n,
        )
    }
}

impl Indicator for Rsi {
    fn next(&mut self, value: f64) -> Option<f64> {
        if let Some(prev) = self.prev_value {
            let change = value - prev;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);

            match (self.smoothing, self.avg_gain, self.avg_loss) {
                (RsiSmoothing::Wilder, Some(prev_ag), Some(prev_al)) => {
                    let n = self.len as f64;
                    self.avg_gain = Some((prev_ag * (n - 1.0) + gain) / n);
                    self.avg_loss = Some((prev_al * (n - 1.0) + loss) / n);
                }
                _ => {
                    self.gains.push_back(gain);
                    self.losses.push_back(loss);
                    if self.gains.len() > self.len {
                        self.gains.pop_front();
                        self.losses.pop_front();
                    }

                    if self.gains.len() == self.len {
                        let (ag, al) = self.window_means();
                        self.avg_gain = Some(ag);
                        self.avg_loss = Some(al);
                        if self.smoothing == RsiSmoothing::Wilder {
                            // Seeded; the window is no longer needed.
                            self.gains.clear();
                            self.losses.clear();
                        }
                    }
                }
            }
        }

        self.prev_value = Some(value);
        self.value()
    }

    fn reset(&mut self) {
        self.prev_value = None;
        self.gains.clear();
        self.losses.clear();
        self.avg_gain = None;
        self.avg_loss = None;
    }

    fn period(&self) -> usize {
        self.len + 1 // need one extra data point for the first change
    }

    fn is_ready(&self) -> bool {
        self.avg_gain.is_some()
    }
}
