//! Connection and polling configuration for the query driver.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;

/// Connection settings for the job queue database (MariaDB/MySQL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQueueConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Database holding the `query_jobs` table.
    #[serde(default = "default_db_name")]
    pub name: String,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_user() -> String {
    "clp-user".to_string()
}

fn default_db_name() -> String {
    "clp-db".to_string()
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            name: default_db_name(),
        }
    }
}

impl JobQueueConfig {
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Options for opening a single connection.
    #[must_use]
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
    }

    /// Copy with the password blanked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.password.is_empty() {
            config.password = "********".to_string();
        }
        config
    }
}

/// Connection settings for the results cache (MongoDB).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsCacheConfig {
    #[serde(default = "default_cache_host")]
    pub host: String,

    #[serde(default = "default_cache_port")]
    pub port: u16,

    /// Database holding per-job result collections and `results-metadata`.
    #[serde(default = "default_cache_db_name")]
    pub db_name: String,
}

fn default_cache_host() -> String {
    "localhost".to_string()
}

fn default_cache_port() -> u16 {
    27017
}

fn default_cache_db_name() -> String {
    "clp-query-results".to_string()
}

impl Default for ResultsCacheConfig {
    fn default() -> Self {
        Self {
            host: default_cache_host(),
            port: default_cache_port(),
            db_name: default_cache_db_name(),
        }
    }
}

impl ResultsCacheConfig {
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    /// MongoDB connection string.
    #[must_use]
    pub fn connection_uri(&self) -> String {
        format!("mongodb://{}:{}/", self.host, self.port)
    }
}

/// Default cap on results the engine returns per search.
pub const DEFAULT_MAX_NUM_RESULTS: u32 = 1000;

/// Default number of status checks before giving up (one hour at 1s).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 3600;

/// Search and polling behaviour of the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// `max_num_results` written into every submitted job.
    #[serde(default = "default_max_num_results")]
    pub max_num_results: u32,

    /// Delay between status checks while a job is still running.
    #[serde(default = "default_polling_interval", with = "humantime_serde")]
    pub polling_interval: Duration,

    /// Status checks before the wait fails. `0` waits without limit.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

fn default_max_num_results() -> u32 {
    DEFAULT_MAX_NUM_RESULTS
}

fn default_polling_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_poll_attempts() -> u32 {
    DEFAULT_MAX_POLL_ATTEMPTS
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_num_results: default_max_num_results(),
            polling_interval: default_polling_interval(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl DriverConfig {
    #[must_use]
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_max_num_results(mut self, max: u32) -> Self {
        self.max_num_results = max;
        self
    }

    /// Wait for jobs with no attempt limit.
    #[must_use]
    pub fn unbounded_wait(self) -> Self {
        self.with_max_poll_attempts(0)
    }

    /// The attempt limit, or `None` when waiting is unbounded.
    #[must_use]
    pub fn poll_limit(&self) -> Option<u32> {
        (self.max_poll_attempts > 0).then_some(self.max_poll_attempts)
    }
}
