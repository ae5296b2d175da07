//! Bollinger Bands: SMA of closes ± `width` population standard deviations.

#[derive(Debug, Clone, Default)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// First defined value at index `length - 1`.
pub fn bollinger(closes: &[f64], length: usize, width: f64) -> BollingerBands {
    let n = closes.len();
    let mut bands = BollingerBands {
        upper: vec![f64::NAN; n],
        middle: vec![f64::NAN; n],
        lower: vec![f64::NAN; n],
    };
    if length == 0 || n < length {
        return bands;
    }

    for i in (length - 1)..n {
        let window = &closes[i + 1 - length..=i];
        let mean = window.iter().sum::<f64>() / length as f64;
        let variance = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / length as f64;
        let deviation = variance.sqrt();

        bands.middle[i] = mean;
        bands.upper[i] = mean + width * deviation;
        bands.lower[i] = mean - width * deviation;
    }

    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn test_middle_is_sma() {
        let bands = bollinger(&[10.0, 11.0, 12.0, 13.0], 3, 2.0);
        assert!(bands.middle[1].is_nan());
        assert_approx(bands.middle[2], 11.0, 1e-12);
        assert_approx(bands.middle[3], 12.0, 1e-12);
    }

    #[test]
    fn test_population_deviation() {
        // mean 11, population variance 2/3
        let bands = bollinger(&[10.0, 11.0, 12.0], 3, 1.5);
        let dev = (2.0_f64 / 3.0).sqrt();
        assert_approx(bands.upper[2], 11.0 + 1.5 * dev, 1e-12);
        assert_approx(bands.lower[2], 11.0 - 1.5 * dev, 1e-12);
    }

    #[test]
    fn test_constant_price_collapses() {
        let bands = bollinger(&[1.1, 1.1, 1.1], 3, 2.0);
        assert_eq!(bands.upper[2], bands.lower[2]);
    }

    #[test]
    fn test_short_input_undefined() {
        let bands = bollinger(&[1.0, 2.0], 3, 2.0);
        assert!(bands.upper.iter().all(|v| v.is_nan()));
    }
}
