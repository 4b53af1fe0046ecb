//! Store seams the driver talks through.

use async_trait::async_trait;

use crate::job::{JobId, JobStatus, JobType};
use crate::record::{Record, ResultsMetadata};

/// Relational queue of query jobs.
///
/// The scheduler owns the `status` column; this side only inserts rows and
/// reads their status.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Insert a job row and return the identifier the store assigned.
    async fn insert_job(&self, job_type: JobType, job_config: &[u8]) -> crate::Result<JobId>;

    /// Read a job's status, or `None` if no such row exists.
    async fn job_status(&self, job_id: JobId) -> crate::Result<Option<JobStatus>>;
}

/// Document store holding each job's results and metadata.
#[async_trait]
pub trait ResultsStore: Send + Sync {
    /// Create the empty result container named after the job.
    async fn create_container(&self, job_id: JobId) -> crate::Result<()>;

    /// Insert the job's document into the shared metadata collection.
    async fn write_metadata(&self, metadata: &ResultsMetadata) -> crate::Result<()>;

    /// Read every record in the job's container, in store order.
    ///
    /// Returns `None` when the container does not exist.
    async fn read_results(&self, job_id: JobId) -> crate::Result<Option<Vec<Record>>>;
}
