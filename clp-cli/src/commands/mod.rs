pub mod config;
pub mod results;
pub mod search;
pub mod serve;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clp_query::{MongoResultsStore, MySqlJobQueue, QueryDriver};

use crate::config::ClpConfig;

/// Build a driver over the configured job queue and results cache.
pub async fn connect_driver(config: &ClpConfig) -> Result<QueryDriver> {
    let job_queue = MySqlJobQueue::new(&config.database);
    let results = MongoResultsStore::connect(&config.results_cache)
        .await
        .context("Failed to set up results cache client")?;
    Ok(QueryDriver::new(
        Arc::new(job_queue),
        Arc::new(results),
        config.search.clone(),
    ))
}
