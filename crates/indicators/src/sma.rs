use crate::Indicator;
use std::collections::VecDeque;

/// Simple Moving Average (SMA).
#[derive(Debug, Clone)]
pub struct Sma {
    len: usize,
    buffer: VecDeque<f64>,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be > 0");
        Self {
            len: period,
            buffer: VecDeque::with_capacity(period + 1),
        }
    }

    /// Get the current SMA value without feeding new data.
    pub fn value(&self) -> Option<f64> {
        if self.buffer.len() == self.len {
            Some(self.buffer.iter().sum::<f64>() / self.len as f64)
        } else {
            None
        }
    }
}

impl Indicator for Sma {
    fn next(&mut self, value: f64) -> Option<f64> {
        self.buffer.push_back(value);
        if self.buffer.len() > self.len {
            self.buffer.pop_front();
        }
        self.value()
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn period(&self) -> usize {
        self.len
    }

    fn is_ready(&self) -> bool {
        self.buffer.len() == self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_sma_basic() {
        let mut sma = Sma::new(3);
        assert_eq!(sma.next(1.0), None);
        assert_eq!(sma.next(2.0), None);
        assert_eq!(sma.next(3.0), Some(2.0));
        assert_eq!(sma.next(4.0), Some(3.0));
        assert_eq!(sma.next(5.0), Some(4.0));
    }

    #[test]
    fn test_sma_reset() {
        let mut sma = Sma::new(2);
        sma.next(10.0);
        sma.next(20.0);
        sma.reset();
        assert!(!sma.is_ready());
        assert_eq!(sma.next(5.0), None);
        assert_eq!(sma.next(15.0), Some(10.0));
    }

    #[test]
    fn test_sma_twenty_of_flat_then_step() {
        let mut closes = vec![10.0; 39];
        closes.push(11.0);
        let out = crate::sma(&closes, 20);
        assert_relative_eq!(crate::last_value(&out).unwrap(), 10.05, max_relative = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_sma_matches_trailing_mean(
            values in prop::collection::vec(0.01f64..10_000.0, 1..120),
            window in 1usize..30,
        ) {
            let out = crate::sma(&values, window);
            prop_assert_eq!(out.len(), values.len());
            for (i, v) in out.iter().enumerate() {
                if i + 1 < window {
                    prop_assert!(v.is_none());
                } else {
                    let slice = &values[i + 1 - window..=i];
                    let expected = slice.iter().sum::<f64>() / window as f64;
                    let got = v.unwrap();
                    prop_assert!(((got - expected) / expected).abs() < 1e-9);
                }
            }
        }
    }
}
