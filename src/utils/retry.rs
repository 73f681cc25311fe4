//! Backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::BootstrapConfig;

/// Backoff for transient failures within one bootstrap attempt.
///
/// - Min delay: `min_backoff_ms`
/// - Max delay: `max_backoff_ms`
/// - Max retries: `max_retries`
/// - Jitter enabled
pub fn bootstrap_backoff(config: &BootstrapConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.min_backoff_ms))
        .with_max_delay(Duration::from_millis(config.max_backoff_ms))
        .with_max_times(config.max_retries)
        .with_jitter()
}

#[cfg(test)]
mod tests {
    use backon::BackoffBuilder;

    use super::*;

    #[test]
    fn test_bootstrap_backoff_is_bounded() {
        let config = BootstrapConfig {
            max_retries: 3,
            min_backoff_ms: 10,
            max_backoff_ms: 40,
            ..BootstrapConfig::default()
        };

        let delays: Vec<Duration> = bootstrap_backoff(&config).build().collect();

        assert_eq!(delays.len(), 3);
        // Jitter can at most double the capped delay.
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(80)));
    }

    #[test]
    fn test_bootstrap_backoff_without_retries() {
        let config = BootstrapConfig {
            max_retries: 0,
            ..BootstrapConfig::default()
        };
        assert_eq!(bootstrap_backoff(&config).build().count(), 0);
    }
}
