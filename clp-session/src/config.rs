//! Pagination cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Page size, expiry and sweep settings shared by every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Records per page. Fixed for the lifetime of a manager.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Idle time after which a session is dropped.
    #[serde(default = "default_ttl", with = "humantime_serde")]
    pub ttl: Duration,

    /// Records kept per session; anything beyond is discarded on store.
    #[serde(default = "default_max_cached_results")]
    pub max_cached_results: usize,

    /// How often the background sweeper removes expired sessions.
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

fn default_page_size() -> usize {
    10
}

fn default_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_max_cached_results() -> usize {
    1000
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            ttl: default_ttl(),
            max_cached_results: default_max_cached_results(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_cached_results(mut self, max: usize) -> Self {
        self.max_cached_results = max;
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.max_cached_results, 1000);
        assert_eq!(config.sweep_interval, Duration::from_secs(600));
    }

    #[test]
    fn durations_parse_humantime() {
        let config: SessionConfig = serde_json::from_value(serde_json::json!({
            "ttl": "15m",
            "sweep_interval": "30s",
        }))
        .unwrap();
        assert_eq!(config.ttl, Duration::from_secs(900));
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.page_size, 10);
    }
}
