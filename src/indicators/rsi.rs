//! Relative Strength Index over closes.
//!
//! Seeded with the simple average of the first `length` gains and losses,
//! then Wilder-smoothed. The first defined value sits at index `length`.

pub fn rsi(closes: &[f64], length: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if length == 0 || n < length + 1 {
        return result;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=length {
        let change = closes[i] - closes[i - 1];
        if change.is_nan() {
            return result;
        }
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= length as f64;
    avg_loss /= length as f64;
    result[length] = rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / length as f64;
    for i in (length + 1)..n {
        let change = closes[i] - closes[i - 1];
        if change.is_nan() {
            // Everything after a gap stays undefined
            break;
        }
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        result[i] = rsi_value(avg_gain, avg_loss);
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn test_all_gains_is_100() {
        let result = rsi(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 100.0, 1e-9);
        assert_approx(result[4], 100.0, 1e-9);
    }

    #[test]
    fn test_all_losses_is_0() {
        let result = rsi(&[5.0, 4.0, 3.0, 2.0], 3);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn test_seed_and_smoothing() {
        // Changes +0.34 -0.25 -0.48 | +0.72
        let result = rsi(&[44.0, 44.34, 44.09, 43.61, 44.33], 3);
        let seed = 100.0 - 100.0 / (1.0 + 0.34 / 0.73);
        assert_approx(result[3], seed, 1e-9);

        let gain = (0.34 / 3.0) * 2.0 / 3.0 + 0.72 / 3.0;
        let loss = (0.73 / 3.0) * 2.0 / 3.0;
        assert_approx(result[4], 100.0 - 100.0 / (1.0 + gain / loss), 1e-9);
    }

    #[test]
    fn test_too_short_is_undefined() {
        assert!(rsi(&[1.0, 2.0, 3.0], 3).iter().all(|v| v.is_nan()));
        assert!(rsi(&[], 14).is_empty());
    }

    #[test]
    fn test_bounded() {
        let result = rsi(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0], 3);
        for v in result.iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(v));
        }
    }
}
