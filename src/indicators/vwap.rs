//! Volume-weighted average price, cumulative over the whole window.

use crate::exchange::Bar;

/// Running Σ(typical × volume) / Σ(volume). Undefined until some volume trades.
pub fn vwap(bars: &[Bar]) -> Vec<f64> {
    let mut weighted = 0.0;
    let mut volume = 0.0;
    bars.iter()
        .map(|bar| {
            weighted += bar.typical_price() * bar.volume;
            volume += bar.volume;
            if volume > 0.0 {
                weighted / volume
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn test_cumulative_weighting() {
        let mut bars = make_bars(&[1.0, 2.0]);
        bars[0].volume = 100.0;
        bars[1].volume = 300.0;
        let tp0 = bars[0].typical_price();
        let tp1 = bars[1].typical_price();

        let result = vwap(&bars);
        assert_approx(result[0], tp0, 1e-12);
        assert_approx(result[1], (tp0 * 100.0 + tp1 * 300.0) / 400.0, 1e-12);
    }

    #[test]
    fn test_zero_volume_is_undefined() {
        let mut bars = make_bars(&[1.0, 2.0]);
        bars[0].volume = 0.0;
        let result = vwap(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_finite());
    }
}
