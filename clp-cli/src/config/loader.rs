use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clp_query::{DriverConfig, JobQueueConfig, ResultsCacheConfig};
use clp_session::SessionConfig;
use directories::ProjectDirs;

use super::types::{
    ClpConfig, RawClpConfig, RawDatabaseConfig, RawResultsCacheConfig, RawSearchConfig,
    RawSessionConfig,
};

/// Overrides the database user from every config file.
pub const DB_USER_ENV: &str = "CLP_DB_USER";
/// Overrides the database password from every config file.
pub const DB_PASS_ENV: &str = "CLP_DB_PASS";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user file, then `explicit`, then environment)
    pub fn load(explicit: Option<&Path>) -> Result<ClpConfig> {
        Self::load_with_env(explicit, |key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with a custom environment lookup.
    pub fn load_with_env(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ClpConfig> {
        let mut raw = RawClpConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Explicit config file; must exist
        if let Some(path) = explicit {
            raw = Self::merge_raw(raw, Self::read_raw(path)?);
        }

        // Layer 3: Environment
        raw = Self::apply_env(raw, env);

        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "clp-search").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn read_raw(path: &Path) -> Result<RawClpConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawClpConfig, overlay: RawClpConfig) -> RawClpConfig {
        RawClpConfig {
            database: RawDatabaseConfig {
                host: overlay.database.host.or(base.database.host),
                port: overlay.database.port.or(base.database.port),
                user: overlay.database.user.or(base.database.user),
                password: overlay.database.password.or(base.database.password),
                name: overlay.database.name.or(base.database.name),
            },
            results_cache: RawResultsCacheConfig {
                host: overlay.results_cache.host.or(base.results_cache.host),
                port: overlay.results_cache.port.or(base.results_cache.port),
                db_name: overlay.results_cache.db_name.or(base.results_cache.db_name),
            },
            search: RawSearchConfig {
                max_num_results: overlay
                    .search
                    .max_num_results
                    .or(base.search.max_num_results),
                polling_interval: overlay
                    .search
                    .polling_interval
                    .or(base.search.polling_interval),
                max_poll_attempts: overlay
                    .search
                    .max_poll_attempts
                    .or(base.search.max_poll_attempts),
            },
            session: RawSessionConfig {
                page_size: overlay.session.page_size.or(base.session.page_size),
                ttl: overlay.session.ttl.or(base.session.ttl),
                max_cached_results: overlay
                    .session
                    .max_cached_results
                    .or(base.session.max_cached_results),
                sweep_interval: overlay
                    .session
                    .sweep_interval
                    .or(base.session.sweep_interval),
            },
        }
    }

    fn apply_env(mut raw: RawClpConfig, env: impl Fn(&str) -> Option<String>) -> RawClpConfig {
        if let Some(user) = env(DB_USER_ENV) {
            raw.database.user = Some(user);
        }
        if let Some(password) = env(DB_PASS_ENV) {
            raw.database.password = Some(password);
        }
        raw
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawClpConfig) -> ClpConfig {
        let database = JobQueueConfig::default();
        let results_cache = ResultsCacheConfig::default();
        let search = DriverConfig::default();
        let session = SessionConfig::default();

        ClpConfig {
            database: JobQueueConfig {
                host: raw.database.host.unwrap_or(database.host),
                port: raw.database.port.unwrap_or(database.port),
                user: raw.database.user.unwrap_or(database.user),
                password: raw.database.password.unwrap_or(database.password),
                name: raw.database.name.unwrap_or(database.name),
            },
            results_cache: ResultsCacheConfig {
                host: raw.results_cache.host.unwrap_or(results_cache.host),
                port: raw.results_cache.port.unwrap_or(results_cache.port),
                db_name: raw.results_cache.db_name.unwrap_or(results_cache.db_name),
            },
            search: DriverConfig {
                max_num_results: raw.search.max_num_results.unwrap_or(search.max_num_results),
                polling_interval: raw
                    .search
                    .polling_interval
                    .unwrap_or(search.polling_interval),
                max_poll_attempts: raw
                    .search
                    .max_poll_attempts
                    .unwrap_or(search.max_poll_attempts),
            },
            session: SessionConfig {
                page_size: raw.session.page_size.unwrap_or(session.page_size),
                ttl: raw.session.ttl.unwrap_or(session.ttl),
                max_cached_results: raw
                    .session
                    .max_cached_results
                    .unwrap_or(session.max_cached_results),
                sweep_interval: raw.session.sweep_interval.unwrap_or(session.sweep_interval),
            },
        }
    }
}
