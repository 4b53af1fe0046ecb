//! Query job lifecycle for a CLP deployment.
//!
//! A search becomes a row in the `query_jobs` table; the CLP scheduler
//! picks it up, runs it and writes matching records into a results-cache
//! collection named after the job. This crate submits such jobs, waits
//! for them to finish and reads their results back.
//!
//! # Key Types
//!
//! - [`QueryDriver`] - Submit, poll and fetch over the two stores
//! - [`JobQueue`] / [`ResultsStore`] - Store seams the driver talks through
//! - [`MySqlJobQueue`] / [`MongoResultsStore`] - Production store backends
//! - [`InMemoryJobQueue`] / [`InMemoryResultsStore`] - Test backends

pub mod config;
pub mod driver;
pub mod error;
pub mod job;
pub mod memory;
pub mod mongo;
pub mod mysql;
pub mod query_config;
pub mod record;
pub mod traits;

// Re-exports
pub use config::{DriverConfig, JobQueueConfig, ResultsCacheConfig};
pub use driver::QueryDriver;
pub use error::{Error, ErrorKind, Result};
pub use job::{JobId, JobStatus, JobType};
pub use memory::{InMemoryJobQueue, InMemoryResultsStore};
pub use mongo::MongoResultsStore;
pub use mysql::MySqlJobQueue;
pub use query_config::QueryConfig;
pub use record::{Record, ResultsMetadata, clean_record, clean_records};
pub use traits::{JobQueue, ResultsStore};
