//! Synthetic slippage applied when the venue publishes no order book.

use crate::config::{ExecutionConfig, SlippageEntry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;

/// Inclusive slippage range in price units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlippageBounds {
    pub min: f64,
    pub max: f64,
}

impl From<&SlippageEntry> for SlippageBounds {
    fn from(entry: &SlippageEntry) -> Self {
        Self {
            min: entry.min,
            max: entry.max,
        }
    }
}

/// Per-symbol bounds with a default entry for everything else.
#[derive(Debug)]
pub struct SlippageTable {
    bounds: HashMap<String, SlippageBounds>,
    default: SlippageBounds,
    rng: Mutex<StdRng>,
}

impl SlippageTable {
    pub fn new(
        bounds: HashMap<String, SlippageBounds>,
        default: SlippageBounds,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            bounds,
            default,
            rng: Mutex::new(rng),
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        let bounds = config
            .slippage
            .iter()
            .map(|entry| (entry.symbol.clone(), SlippageBounds::from(entry)))
            .collect();
        Self::new(
            bounds,
            SlippageBounds::from(&config.default_slippage),
            config.rng_seed,
        )
    }

    /// Bounds for `symbol`, falling back to the default entry.
    pub fn bounds_for(&self, symbol: &str) -> SlippageBounds {
        self.bounds.get(symbol).copied().unwrap_or(self.default)
    }

    /// Draw a slippage amount for `symbol` uniformly from its bounds.
    pub fn sample(&self, symbol: &str) -> f64 {
        let SlippageBounds { min, max } = self.bounds_for(symbol);
        if min >= max {
            return min;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(min..=max)
    }
}
