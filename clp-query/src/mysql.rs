//! MariaDB/MySQL-backed job queue.
//!
//! Each call opens its own connection and closes it before returning, so
//! no connection outlives the request that needed it.

use std::future::Future;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, instrument, warn};

use crate::config::JobQueueConfig;
use crate::error::Result;
use crate::job::{JobId, JobStatus, JobType};
use crate::traits::JobQueue;

/// Job queue backed by the `query_jobs` table.
#[derive(Clone)]
pub struct MySqlJobQueue {
    options: MySqlConnectOptions,
}

impl MySqlJobQueue {
    #[must_use]
    pub fn new(config: &JobQueueConfig) -> Self {
        Self {
            options: config.connect_options(),
        }
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        Ok(self.options.connect().await?)
    }
}

/// Finish a statement once its connection is closed. A failed close is only
/// logged; the statement's own outcome is returned.
async fn finish<T>(
    outcome: sqlx::Result<T>,
    close: impl Future<Output = sqlx::Result<()>>,
) -> Result<T> {
    if let Err(e) = close.await {
        warn!(error = %e, "Failed to close job queue connection");
    }
    Ok(outcome?)
}

#[async_trait]
impl JobQueue for MySqlJobQueue {
    #[instrument(skip(self, job_config), fields(config_len = job_config.len()), level = "debug")]
    async fn insert_job(&self, job_type: JobType, job_config: &[u8]) -> Result<JobId> {
        let mut conn = self.connect().await?;
        let inserted = sqlx::query("INSERT INTO query_jobs (type, job_config) VALUES (?, ?)")
            .bind(job_type.code())
            .bind(job_config)
            .execute(&mut conn)
            .await;
        let inserted = finish(inserted, conn.close()).await?;

        let job_id = JobId(inserted.last_insert_id());
        debug!(%job_id, %job_type, "Inserted query job");
        Ok(job_id)
    }

    #[instrument(skip(self), level = "debug")]
    async fn job_status(&self, job_id: JobId) -> Result<Option<JobStatus>> {
        let mut conn = self.connect().await?;
        let code = sqlx::query_scalar::<_, i32>("SELECT status FROM query_jobs WHERE id = ?")
            .bind(job_id.0)
            .fetch_optional(&mut conn)
            .await;
        let code = finish(code, conn.close()).await?;

        Ok(code.map(JobStatus::from_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn failed_close_keeps_the_statement_result() {
        let inserted = finish(Ok(42u64), async { Err(sqlx::Error::PoolClosed) }).await;
        assert_eq!(inserted.unwrap(), 42);
    }

    #[tokio::test]
    async fn statement_error_wins_over_close_error() {
        let err = finish::<u64>(Err(sqlx::Error::RowNotFound), async {
            Err(sqlx::Error::PoolClosed)
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(err.to_string().contains("no rows returned"));
        assert!(!err.to_string().contains("closed pool"));
    }

    #[tokio::test]
    async fn clean_close_passes_the_result_through() {
        let status = finish(Ok(Some(2)), async { Ok(()) }).await.unwrap();
        assert_eq!(status, Some(2));
    }
}
