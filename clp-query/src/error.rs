//! Error types for the query job lifecycle.

use crate::job::JobId;

/// Error type for query lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested time range ends before it begins.
    #[error("end timestamp {end_ts} is earlier than begin timestamp {begin_ts}")]
    InvalidRange { begin_ts: i64, end_ts: i64 },

    /// Connection or I/O failure against the job queue or results cache.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The job row was written but its result container or metadata was not.
    ///
    /// The job row is left in place.
    #[error("query job {job_id} was queued but its results cache setup failed: {source}")]
    PartialSubmission {
        job_id: JobId,
        #[source]
        source: Box<Error>,
    },

    /// No job with this identifier exists.
    #[error("query job {0} not found")]
    NotFound(JobId),

    #[error("query job {0} failed")]
    JobFailed(JobId),

    #[error("query job {0} was cancelled")]
    JobCancelled(JobId),

    #[error("query job {0} was killed")]
    JobKilled(JobId),

    /// The job queue reported a status code this client does not know.
    #[error("query job {job_id} has unknown status {code}")]
    UnknownStatus { job_id: JobId, code: i32 },

    /// The job was still running after the configured number of status checks.
    #[error("query job {job_id} did not complete after {attempts} status checks")]
    PollLimitExceeded { job_id: JobId, attempts: u32 },

    /// The job config could not be encoded as MessagePack.
    #[error("failed to encode job config: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// Coarse classification of an [`Error`], stable across variants that carry
/// different context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRange,
    StoreUnavailable,
    NotFound,
    JobFailed,
    JobCancelled,
    JobKilled,
    UnknownStatus,
    Timeout,
    Encoding,
}

impl Error {
    /// Map this error onto its [`ErrorKind`].
    ///
    /// A partial submission is a store failure; the orphaned job id stays
    /// available on the variant itself.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange { .. } => ErrorKind::InvalidRange,
            Self::StoreUnavailable(_) | Self::PartialSubmission { .. } => {
                ErrorKind::StoreUnavailable
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::JobFailed(_) => ErrorKind::JobFailed,
            Self::JobCancelled(_) => ErrorKind::JobCancelled,
            Self::JobKilled(_) => ErrorKind::JobKilled,
            Self::UnknownStatus { .. } => ErrorKind::UnknownStatus,
            Self::PollLimitExceeded { .. } => ErrorKind::Timeout,
            Self::Encode(_) => ErrorKind::Encoding,
        }
    }

    /// The job left behind by a failed submission, if any.
    #[must_use]
    pub fn orphaned_job(&self) -> Option<JobId> {
        match self {
            Self::PartialSubmission { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Self::StoreUnavailable(format!("job queue: {e}"))
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(e: mongodb::error::Error) -> Self {
        Self::StoreUnavailable(format!("results cache: {e}"))
    }
}

impl From<mongodb::bson::ser::Error> for Error {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        Self::StoreUnavailable(format!("results cache document: {e}"))
    }
}

/// Result type alias for query lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;
