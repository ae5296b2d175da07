//! Average True Range.
//!
//! TR[t] = max(high - low, |high - prev_close|, |low - prev_close|). The first
//! bar has no previous close, so its true range is undefined and the first
//! ATR (mean of TR[1..=length]) lands at index `length`. Wilder smoothing
//! afterwards.

use crate::exchange::Bar;

pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let bar = &bars[i];
        let prev_close = bars[i - 1].close;
        tr[i] = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());
    }
    tr
}

pub fn atr(bars: &[Bar], length: usize) -> Vec<f64> {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];
    if length == 0 || n < length + 1 {
        return result;
    }

    let tr = true_range(bars);
    let mut value = tr[1..=length].iter().sum::<f64>() / length as f64;
    result[length] = value;

    for i in (length + 1)..n {
        value = (value * (length - 1) as f64 + tr[i]) / length as f64;
        result[i] = value;
    }

    result
}
