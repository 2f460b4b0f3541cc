use scanner_core::{IndicatorParams, IndicatorSnapshot};
use scanner_data::Series;
use scanner_indicators as ind;
use serde::{Deserialize, Serialize};

/// Compute the latest indicator values for a series.
///
/// Series shorter than an indicator's window leave that field `None`.
pub fn compute_snapshot(closes: &[f64], params: &IndicatorParams) -> IndicatorSnapshot {
    let rsi = if params.rsi_period > 0 {
        ind::last_value(&ind::rsi(closes, params.rsi_period, params.rsi_smoothing))
    } else {
        None
    };

    let macd = if params.macd_fast > 0 && params.macd_fast < params.macd_slow && params.macd_signal > 0 {
        ind::macd(closes, params.macd_fast, params.macd_slow, params.macd_signal)
            .last()
            .copied()
            .flatten()
            .filter(|o| o.macd.is_finite() && o.signal.is_finite())
    } else {
        None
    };

    let ma = if params.ma_window > 0 {
        ind::last_value(&ind::sma(closes, params.ma_window))
    } else {
        None
    };

    IndicatorSnapshot {
        rsi,
        macd: macd.map(|o| o.macd),
        macd_signal: macd.map(|o| o.signal),
        ma,
    }
}

/// Everything a predicate may look at for one instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub snapshot: IndicatorSnapshot,
    pub latest_close: Option<f64>,
    pub previous_close: Option<f64>,
    pub latest_volume: Option<f64>,
    /// Mean volume over the volume window, latest candle included.
    pub average_volume: Option<f64>,
}

impl EvaluationInput {
    /// `volume_window` of `None` averages volume over the whole series.
    pub fn from_series(series: &Series, params: &IndicatorParams, volume_window: Option<usize>) -> Self {
        let volumes = series.volumes();
        let window = match volume_window {
            Some(n) if n > 0 => &volumes[volumes.len().saturating_sub(n)..],
            _ => volumes,
        };

        Self {
            snapshot: compute_snapshot(series.closes(), params),
            latest_close: series.latest().map(|c| c.close),
            previous_close: series.previous().map(|c| c.close),
            latest_volume: series.latest().map(|c| c.volume),
            average_volume: ind::mean(window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scanner_core::Candle;

    fn series_from_closes(closes: &[f64], volumes: &[f64]) -> Series {
        let candles = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (c, v))| Candle {
                start: i as i64 * 60_000,
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: *v,
                turnover: None,
            })
            .collect();
        Series::from_candles("TESTUSDT", candles, Series::UNBOUNDED)
    }

    #[test]
    fn test_flat_then_step_snapshot() {
        let mut closes = vec![10.0; 39];
        closes.push(11.0);
        let snapshot = compute_snapshot(&closes, &IndicatorParams::default());

        assert_relative_eq!(snapshot.rsi.unwrap(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(snapshot.ma.unwrap(), 10.05, max_relative = 1e-12);
        // A step up pulls the fast EMA above the slow one.
        assert!(snapshot.macd.unwrap() > snapshot.macd_signal.unwrap());
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let snapshot = compute_snapshot(&[1.0, 2.0, 3.0], &IndicatorParams::default());
        assert_eq!(snapshot, IndicatorSnapshot::default());
    }

    #[test]
    fn test_partial_history_fills_what_it_can() {
        // 25 closes: enough for RSI(14) and MA(20), not for MACD(12, 26, 9).
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let snapshot = compute_snapshot(&closes, &IndicatorParams::default());
        assert!(snapshot.rsi.is_some());
        assert!(snapshot.ma.is_some());
        assert!(snapshot.macd.is_none());
        assert!(snapshot.macd_signal.is_none());
    }

    #[test]
    fn test_volume_window() {
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0], &[10.0, 10.0, 20.0, 40.0]);
        let params = IndicatorParams::default();

        let all = EvaluationInput::from_series(&series, &params, None);
        assert_eq!(all.average_volume, Some(20.0));
        assert_eq!(all.latest_volume, Some(40.0));
        assert_eq!(all.latest_close, Some(4.0));
        assert_eq!(all.previous_close, Some(3.0));

        let last_two = EvaluationInput::from_series(&series, &params, Some(2));
        assert_eq!(last_two.average_volume, Some(30.0));
    }

    #[test]
    fn test_empty_series_input() {
        let series = Series::from_candles("EMPTY", Vec::new(), 10);
        let input = EvaluationInput::from_series(&series, &IndicatorParams::default(), None);
        assert_eq!(input, EvaluationInput::default());
    }
}
