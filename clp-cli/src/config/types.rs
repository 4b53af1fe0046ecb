use std::time::Duration;

use clp_query::{DriverConfig, JobQueueConfig, ResultsCacheConfig};
use clp_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawClpConfig {
    #[serde(default)]
    pub database: RawDatabaseConfig,

    #[serde(default)]
    pub results_cache: RawResultsCacheConfig,

    #[serde(default)]
    pub search: RawSearchConfig,

    #[serde(default)]
    pub session: RawSessionConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawResultsCacheConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSearchConfig {
    pub max_num_results: Option<u32>,

    #[serde(default, with = "humantime_serde")]
    pub polling_interval: Option<Duration>,

    /// `0` waits without limit.
    pub max_poll_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSessionConfig {
    pub page_size: Option<usize>,

    #[serde(default, with = "humantime_serde")]
    pub ttl: Option<Duration>,

    pub max_cached_results: Option<usize>,

    #[serde(default, with = "humantime_serde")]
    pub sweep_interval: Option<Duration>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClpConfig {
    /// Job queue database (`query_jobs`)
    #[serde(default)]
    pub database: JobQueueConfig,

    /// Results cache holding per-job collections
    #[serde(default)]
    pub results_cache: ResultsCacheConfig,

    #[serde(default)]
    pub search: DriverConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl ClpConfig {
    /// Copy safe to print: the database password is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            database: self.database.redacted(),
            ..self.clone()
        }
    }
}
