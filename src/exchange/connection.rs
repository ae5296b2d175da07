//! Venue connectivity check with bounded reconnect.

use super::traits::TradingVenue;
use crate::error::TradingError;
use crate::utils::{Clock, RetryPolicy};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ConnectionSupervisor {
    policy: RetryPolicy,
}

impl ConnectionSupervisor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Establish the first session. Failure here is fatal to the process.
    pub async fn initialize(
        &self,
        venue: &dyn TradingVenue,
        clock: &dyn Clock,
    ) -> Result<(), TradingError> {
        self.ensure_connected(venue, clock)
            .await
            .map_err(|e| TradingError::Init(e.to_string()))
    }

    /// Return immediately if the venue is up, otherwise reconnect with the
    /// configured attempt budget and fixed delay.
    pub async fn ensure_connected(
        &self,
        venue: &dyn TradingVenue,
        clock: &dyn Clock,
    ) -> Result<(), TradingError> {
        if venue.is_connected().await {
            return Ok(());
        }

        warn!("Venue connection lost, reconnecting");
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::from("not attempted");

        for attempt in 1..=max_attempts {
            match venue.connect().await {
                Ok(()) => {
                    info!(attempt, "Reconnected to venue");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Reconnect attempt failed");
                    last_error = e.to_string();
                    if self.policy.has_next(attempt) {
                        clock.sleep(self.policy.delay).await;
                    }
                }
            }
        }

        error!(critical = true, max_attempts, error = %last_error, "Could not reconnect to venue");
        Err(TradingError::Connectivity(format!(
            "{max_attempts} reconnect attempts failed: {last_error}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperVenue;
    use crate::utils::ManualClock;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn supervisor() -> ConnectionSupervisor {
        ConnectionSupervisor::new(RetryPolicy::new(3, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn test_connected_venue_is_untouched() {
        let venue = PaperVenue::new(dec!(1000));
        let clock = ManualClock::new(Utc::now());
        venue.fail_next_connects(5).await;

        assert!(supervisor().ensure_connected(&venue, &clock).await.is_ok());
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_reconnects_within_budget() {
        let venue = PaperVenue::new(dec!(1000));
        let clock = ManualClock::new(Utc::now());
        venue.set_connected(false).await;
        venue.fail_next_connects(2).await;

        assert!(supervisor().ensure_connected(&venue, &clock).await.is_ok());
        assert_eq!(clock.total_slept(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_exhaustion_is_connectivity_error() {
        let venue = PaperVenue::new(dec!(1000));
        let clock = ManualClock::new(Utc::now());
        venue.set_connected(false).await;
        venue.fail_next_connects(3).await;

        let err = supervisor().ensure_connected(&venue, &clock).await.unwrap_err();
        assert!(matches!(err, TradingError::Connectivity(_)));
        // No wait after the final attempt
        assert_eq!(clock.total_slept(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_initial_failure_is_fatal() {
        let venue = PaperVenue::new(dec!(1000));
        let clock = ManualClock::new(Utc::now());
        venue.set_connected(false).await;
        venue.fail_next_connects(3).await;

        let err = supervisor().initialize(&venue, &clock).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
