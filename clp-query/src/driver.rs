//! Submit, poll and fetch for search jobs.
//!
//! [`QueryDriver`] holds no per-job state: everything it knows about a job
//! lives in the two stores and is addressed by the [`JobId`] that
//! [`submit`](QueryDriver::submit) returns.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::DriverConfig;
use crate::error::{Error, Result};
use crate::job::{JobId, JobStatus, JobType};
use crate::query_config::QueryConfig;
use crate::record::{Record, ResultsMetadata};
use crate::traits::{JobQueue, ResultsStore};

/// Drives search jobs through the job queue and the results cache.
#[derive(Clone)]
pub struct QueryDriver {
    job_queue: Arc<dyn JobQueue>,
    results: Arc<dyn ResultsStore>,
    config: DriverConfig,
}

impl QueryDriver {
    #[must_use]
    pub fn new(
        job_queue: Arc<dyn JobQueue>,
        results: Arc<dyn ResultsStore>,
        config: DriverConfig,
    ) -> Self {
        Self {
            job_queue,
            results,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Submit a case-insensitive search over `[begin_ts, end_ts]` (epoch ms).
    ///
    /// The range is checked before anything is written.
    pub async fn submit(&self, query: &str, begin_ts: i64, end_ts: i64) -> Result<JobId> {
        let config = QueryConfig::new(query, begin_ts, end_ts, self.config.max_num_results)?;
        self.submit_config(&config).await
    }

    /// Submit a prepared search job.
    ///
    /// Inserts the job row, then creates its empty result collection and
    /// its `results-metadata` document. If either of the last two steps
    /// fails the row stays queued and the error is
    /// [`Error::PartialSubmission`] carrying its id.
    #[instrument(skip(self, config), fields(query = %config.query_string()), level = "debug")]
    pub async fn submit_config(&self, config: &QueryConfig) -> Result<JobId> {
        let job_config = config.encode()?;
        let job_id = self
            .job_queue
            .insert_job(JobType::SearchOrAggregation, &job_config)
            .await?;

        if let Err(e) = self.prepare_results(job_id).await {
            warn!(%job_id, error = %e, "Query job queued without results cache setup");
            return Err(Error::PartialSubmission {
                job_id,
                source: Box::new(e),
            });
        }

        info!(
            %job_id,
            begin_ts = config.begin_timestamp(),
            end_ts = config.end_timestamp(),
            "Submitted query job"
        );
        Ok(job_id)
    }

    async fn prepare_results(&self, job_id: JobId) -> Result<()> {
        self.results.create_container(job_id).await?;
        self.results
            .write_metadata(&ResultsMetadata::querying(job_id))
            .await
    }

    /// Current status of a job.
    pub async fn read_status(&self, job_id: JobId) -> Result<JobStatus> {
        self.job_queue
            .job_status(job_id)
            .await?
            .ok_or(Error::NotFound(job_id))
    }

    /// Poll until the job leaves the pending/running/cancelling states.
    ///
    /// Succeeds only when the job ends in [`JobStatus::Succeeded`]. With a
    /// poll limit configured, gives up with [`Error::PollLimitExceeded`]
    /// after that many status reads.
    #[instrument(skip(self), level = "debug")]
    pub async fn await_completion(&self, job_id: JobId) -> Result<()> {
        let limit = self.config.poll_limit();
        let mut attempts: u32 = 0;

        loop {
            let status = self.read_status(job_id).await?;
            attempts = attempts.saturating_add(1);

            if let Some(outcome) = completion_outcome(job_id, status) {
                if outcome.is_ok() {
                    info!(%job_id, attempts, "Query job succeeded");
                }
                return outcome;
            }

            if limit.is_some_and(|max| attempts >= max) {
                warn!(%job_id, %status, attempts, "Gave up waiting for query job");
                return Err(Error::PollLimitExceeded { job_id, attempts });
            }

            debug!(%job_id, %status, attempts, "Query job still in progress");
            tokio::time::sleep(self.config.polling_interval).await;
        }
    }

    /// Every record currently in the job's result collection, in store order.
    ///
    /// Safe to call before the job finishes; the result may be partial.
    pub async fn read_results(&self, job_id: JobId) -> Result<Vec<Record>> {
        let records = self
            .results
            .read_results(job_id)
            .await?
            .ok_or(Error::NotFound(job_id))?;
        debug!(%job_id, count = records.len(), "Read query results");
        Ok(records)
    }

    /// Submit, wait and read in one call.
    pub async fn search(
        &self,
        query: &str,
        begin_ts: i64,
        end_ts: i64,
    ) -> Result<(JobId, Vec<Record>)> {
        let job_id = self.submit(query, begin_ts, end_ts).await?;
        self.await_completion(job_id).await?;
        let records = self.read_results(job_id).await?;
        Ok((job_id, records))
    }
}

/// `None` while the job is still in flight, otherwise how the wait ends.
fn completion_outcome(job_id: JobId, status: JobStatus) -> Option<Result<()>> {
    match status {
        JobStatus::Pending | JobStatus::Running | JobStatus::Cancelling => None,
        JobStatus::Succeeded => Some(Ok(())),
        JobStatus::Failed => Some(Err(Error::JobFailed(job_id))),
        JobStatus::Cancelled => Some(Err(Error::JobCancelled(job_id))),
        JobStatus::Killed => Some(Err(Error::JobKilled(job_id))),
        JobStatus::Unknown(code) => Some(Err(Error::UnknownStatus { job_id, code })),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::{InMemoryJobQueue, InMemoryResultsStore};

    struct Harness {
        queue: Arc<InMemoryJobQueue>,
        store: Arc<InMemoryResultsStore>,
        driver: QueryDriver,
    }

    fn harness_with(config: DriverConfig) -> Harness {
        let queue = Arc::new(InMemoryJobQueue::new());
        let store = Arc::new(InMemoryResultsStore::new());
        let driver = QueryDriver::new(queue.clone(), store.clone(), config);
        Harness {
            queue,
            store,
            driver,
        }
    }

    fn harness() -> Harness {
        harness_with(DriverConfig::default())
    }

    fn record(ts: i64, message: &str) -> Record {
        let mut record = Record::new();
        record.insert("_id".to_string(), json!({ "$oid": format!("{ts:024x}") }));
        record.insert("timestamp".to_string(), json!(ts));
        record.insert("message".to_string(), json!(message));
        record
    }

    // ==================== Submit Tests ====================

    #[tokio::test]
    async fn submit_writes_row_container_and_metadata() {
        let h = harness();

        let job_id = h.driver.submit("error AND disk", 0, 1_000).await.unwrap();

        assert_eq!(job_id, JobId(1));
        assert_eq!(h.queue.job_type(job_id).await, Some(JobType::SearchOrAggregation));
        assert!(h.store.has_container(job_id).await);

        let metadata = h.store.metadata(job_id).await.unwrap();
        assert_eq!(metadata, ResultsMetadata::querying(job_id));
        assert_eq!(metadata.last_signal, "resp-querying");
        assert_eq!(metadata.query_engine, "clp");
    }

    #[tokio::test]
    async fn submitted_config_is_case_insensitive_with_default_cap() {
        let h = harness();

        let job_id = h.driver.submit("timeout", 5, 9).await.unwrap();

        let bytes = h.queue.job_config(job_id).await.unwrap();
        let decoded: BTreeMap<String, Value> = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded["query_string"], json!("timeout"));
        assert_eq!(decoded["begin_timestamp"], json!(5));
        assert_eq!(decoded["end_timestamp"], json!(9));
        assert_eq!(decoded["ignore_case"], json!(true));
        assert_eq!(decoded["max_num_results"], json!(1000));
        assert_eq!(decoded["dataset"], Value::Null);
    }

    #[tokio::test]
    async fn configured_result_cap_is_written_into_job() {
        let h = harness_with(DriverConfig::default().with_max_num_results(50));

        let job_id = h.driver.submit("x", 0, 0).await.unwrap();

        let bytes = h.queue.job_config(job_id).await.unwrap();
        let decoded: BTreeMap<String, Value> = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded["max_num_results"], json!(50));
    }

    #[tokio::test]
    async fn inverted_range_writes_nothing() {
        let h = harness();

        let err = h.driver.submit("x", 20, 10).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRange);
        assert!(h.queue.is_empty().await);
        assert_eq!(h.store.container_count().await, 0);
        assert_eq!(h.store.metadata_count().await, 0);
    }

    #[tokio::test]
    async fn equal_bounds_are_a_valid_range() {
        let h = harness();
        assert!(h.driver.submit("x", 42, 42).await.is_ok());
    }

    #[tokio::test]
    async fn queue_failure_writes_nothing_else() {
        let h = harness();
        h.queue.set_unavailable(true);

        let err = h.driver.submit("x", 0, 1).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(err.orphaned_job(), None);
        assert_eq!(h.store.container_count().await, 0);
        assert_eq!(h.store.metadata_count().await, 0);
    }

    #[tokio::test]
    async fn container_failure_leaves_orphaned_row() {
        let h = harness();
        h.store.fail_create_container(true);

        let err = h.driver.submit("x", 0, 1).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(err.orphaned_job(), Some(JobId(1)));
        assert_eq!(h.queue.len().await, 1);
        assert_eq!(h.store.metadata_count().await, 0);
    }

    #[tokio::test]
    async fn metadata_failure_leaves_row_and_container() {
        let h = harness();
        h.store.fail_write_metadata(true);

        let err = h.driver.submit("x", 0, 1).await.unwrap_err();

        assert!(matches!(err, Error::PartialSubmission { job_id: JobId(1), .. }));
        assert_eq!(h.queue.len().await, 1);
        assert!(h.store.has_container(JobId(1)).await);
        assert_eq!(h.store.metadata_count().await, 0);
    }

    // ==================== Status Tests ====================

    #[tokio::test]
    async fn fresh_job_reads_pending() {
        let h = harness();
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();

        assert_eq!(h.driver.read_status(job_id).await.unwrap(), JobStatus::Pending);
    }

    #[tokio::test]
    async fn never_submitted_job_is_not_found() {
        let h = harness();

        let err = h.driver.read_status(JobId(404)).await.unwrap_err();

        assert!(matches!(err, Error::NotFound(JobId(404))));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unavailable_queue_surfaces_on_status_read() {
        let h = harness();
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();
        h.queue.set_unavailable(true);

        let err = h.driver.read_status(job_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }

    // ==================== Await Completion Tests ====================

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_waiting_statuses() {
        let h = harness();
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();
        h.queue
            .script_statuses(
                job_id,
                [
                    JobStatus::Pending,
                    JobStatus::Running,
                    JobStatus::Running,
                    JobStatus::Succeeded,
                ],
            )
            .await;

        let started = tokio::time::Instant::now();
        h.driver.await_completion(job_id).await.unwrap();

        assert_eq!(h.queue.status_reads(), 4);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn already_succeeded_job_returns_without_sleeping() {
        let h = harness();
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();
        h.queue.set_status(job_id, JobStatus::Succeeded).await;

        let started = tokio::time::Instant::now();
        h.driver.await_completion(job_id).await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(1));
        assert_eq!(h.queue.status_reads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failures_map_to_matching_errors() {
        let cases = [
            (JobStatus::Failed, ErrorKind::JobFailed),
            (JobStatus::Cancelled, ErrorKind::JobCancelled),
            (JobStatus::Killed, ErrorKind::JobKilled),
        ];

        for (terminal, expected) in cases {
            let h = harness();
            let job_id = h.driver.submit("x", 0, 1).await.unwrap();
            h.queue
                .script_statuses(job_id, [JobStatus::Running, terminal])
                .await;

            let err = h.driver.await_completion(job_id).await.unwrap_err();
            assert_eq!(err.kind(), expected, "terminal status {terminal}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_keeps_waiting_until_cancelled() {
        let h = harness();
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();
        h.queue
            .script_statuses(
                job_id,
                [JobStatus::Running, JobStatus::Cancelling, JobStatus::Cancelled],
            )
            .await;

        let err = h.driver.await_completion(job_id).await.unwrap_err();

        assert!(matches!(err, Error::JobCancelled(id) if id == job_id));
        assert_eq!(h.queue.status_reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_code_fails_the_wait() {
        let h = harness();
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();
        h.queue.script_codes(job_id, [1, 12]).await;

        let err = h.driver.await_completion(job_id).await.unwrap_err();

        assert!(matches!(err, Error::UnknownStatus { code: 12, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_limit_bounds_the_wait() {
        let h = harness_with(DriverConfig::default().with_max_poll_attempts(3));
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();
        h.queue.set_status(job_id, JobStatus::Running).await;

        let err = h.driver.await_completion(job_id).await.unwrap_err();

        assert!(matches!(err, Error::PollLimitExceeded { attempts: 3, .. }));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(h.queue.status_reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_wait_outlasts_default_limit() {
        let h = harness_with(
            DriverConfig::default()
                .unbounded_wait()
                .with_polling_interval(Duration::from_millis(10)),
        );
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();
        let mut statuses = vec![JobStatus::Running; 5_000];
        statuses.push(JobStatus::Succeeded);
        h.queue.script_statuses(job_id, statuses).await;

        h.driver.await_completion(job_id).await.unwrap();

        assert_eq!(h.queue.status_reads(), 5_001);
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_on_unknown_job_is_not_found() {
        let h = harness();

        let err = h.driver.await_completion(JobId(9)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_caller_does_not_block_others() {
        let h = harness();
        let slow = h.driver.submit("slow", 0, 1).await.unwrap();
        let fast = h.driver.submit("fast", 0, 1).await.unwrap();
        h.queue.set_status(slow, JobStatus::Running).await;
        h.queue.set_status(fast, JobStatus::Succeeded).await;

        let driver = h.driver.clone();
        let waiter = tokio::spawn(async move { driver.await_completion(slow).await });
        tokio::time::sleep(Duration::from_secs(5)).await;

        h.driver.await_completion(fast).await.unwrap();
        assert!(!waiter.is_finished());

        h.queue.set_status(slow, JobStatus::Succeeded).await;
        waiter.await.unwrap().unwrap();
    }

    // ==================== Read Results Tests ====================

    #[tokio::test]
    async fn results_are_empty_right_after_submit() {
        let h = harness();
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();

        assert!(h.driver.read_results(job_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn results_come_back_in_store_order() {
        let h = harness();
        let job_id = h.driver.submit("x", 0, 1).await.unwrap();
        let records = vec![record(3, "c"), record(1, "a"), record(2, "b")];
        h.store.append_results(job_id, records.clone()).await;

        assert_eq!(h.driver.read_results(job_id).await.unwrap(), records);
    }

    #[tokio::test]
    async fn results_for_missing_container_are_not_found() {
        let h = harness();

        let err = h.driver.read_results(JobId(77)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn search_runs_the_whole_lifecycle() {
        let h = harness();
        let driver = h.driver.clone();
        let search = tokio::spawn(async move { driver.search("disk", 0, 100).await });

        // the engine writes results and completes the job while the driver polls
        tokio::time::sleep(Duration::from_millis(1)).await;
        h.store
            .append_results(JobId(1), [record(10, "disk full")])
            .await;
        h.queue.set_status(JobId(1), JobStatus::Succeeded).await;

        let (job_id, records) = search.await.unwrap().unwrap();
        assert_eq!(job_id, JobId(1));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["message"], json!("disk full"));
    }
}
