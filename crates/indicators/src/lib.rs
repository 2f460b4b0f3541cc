pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

/// Trait for streaming (incremental) indicators.
/// Feed one value at a time; the indicator maintains internal state.
pub trait Indicator: Send + Sync {
    /// Process the next value and return the indicator output (if ready).
    fn next(&mut self, value: f64) -> Option<f64>;

    /// Reset the indicator to its initial state.
    fn reset(&mut self);

    /// The minimum number of data points needed before the indicator produces output.
    fn period(&self) -> usize;

    /// Whether the indicator has enough data to produce output.
    fn is_ready(&self) -> bool;
}

/// Run a streaming indicator over a whole series, one output per input.
///
/// `None` marks indices where the indicator has insufficient data.
pub fn series<I: Indicator>(mut indicator: I, values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| indicator.next(*v).filter(|x| x.is_finite()))
        .collect()
}

/// Latest finite value of an indicator series.
pub fn last_value(values: &[Option<f64>]) -> Option<f64> {
    values.last().copied().flatten().filter(|v| v.is_finite())
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    series(sma::Sma::new(window), values)
}

pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    series(ema::Ema::new(period), values)
}

pub fn rsi(values: &[f64], period: usize, smoothing: rsi::RsiSmoothing) -> Vec<Option<f64>> {
    series(rsi::Rsi::with_smoothing(period, smoothing), values)
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<Option<macd::MacdOutput>> {
    let mut indicator = macd::Macd::new(fast, slow, signal);
    values.iter().map(|v| indicator.next_output(*v)).collect()
}
