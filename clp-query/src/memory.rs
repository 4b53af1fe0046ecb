//! In-memory store implementations for testing.
//!
//! These stand in for MariaDB and MongoDB without running either. Tests
//! play the scheduler's part by scripting job statuses and appending
//! result records, and can inject store failures.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::job::{JobId, JobStatus, JobType};
use crate::record::{Record, ResultsMetadata};
use crate::traits::{JobQueue, ResultsStore};

/// A row of the in-memory `query_jobs` table.
#[derive(Debug)]
struct JobRow {
    job_type: JobType,
    job_config: Vec<u8>,
    status: i32,
    /// Statuses handed out one per read before `status` sticks.
    scripted: VecDeque<i32>,
}

/// In-memory job queue with an auto-increment identifier.
pub struct InMemoryJobQueue {
    rows: RwLock<HashMap<JobId, JobRow>>,
    next_id: AtomicU64,
    status_reads: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryJobQueue {
    /// Create an empty queue; the first job gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            status_reads: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Overwrite a job's status, dropping any scripted sequence.
    pub async fn set_status(&self, job_id: JobId, status: JobStatus) {
        if let Some(row) = self.rows.write().await.get_mut(&job_id) {
            row.scripted.clear();
            row.status = status.code();
        }
    }

    /// Hand out `statuses` one per status read; the last one then sticks.
    pub async fn script_statuses(
        &self,
        job_id: JobId,
        statuses: impl IntoIterator<Item = JobStatus>,
    ) {
        if let Some(row) = self.rows.write().await.get_mut(&job_id) {
            row.scripted = statuses.into_iter().map(JobStatus::code).collect();
        }
    }

    /// Like [`script_statuses`](Self::script_statuses) with raw codes.
    pub async fn script_codes(&self, job_id: JobId, codes: impl IntoIterator<Item = i32>) {
        if let Some(row) = self.rows.write().await.get_mut(&job_id) {
            row.scripted = codes.into_iter().collect();
        }
    }

    /// The encoded config a job was submitted with.
    pub async fn job_config(&self, job_id: JobId) -> Option<Vec<u8>> {
        self.rows
            .read()
            .await
            .get(&job_id)
            .map(|row| row.job_config.clone())
    }

    /// The type a job was submitted with.
    pub async fn job_type(&self, job_id: JobId) -> Option<JobType> {
        self.rows.read().await.get(&job_id).map(|row| row.job_type)
    }

    /// Number of job rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Total status reads served so far.
    pub fn status_reads(&self) -> u64 {
        self.status_reads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable(
                "job queue: connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn insert_job(&self, job_type: JobType, job_config: &[u8]) -> Result<JobId> {
        self.check_available()?;

        let job_id = JobId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.rows.write().await.insert(
            job_id,
            JobRow {
                job_type,
                job_config: job_config.to_vec(),
                status: JobStatus::Pending.code(),
                scripted: VecDeque::new(),
            },
        );
        Ok(job_id)
    }

    async fn job_status(&self, job_id: JobId) -> Result<Option<JobStatus>> {
        self.check_available()?;
        self.status_reads.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(&job_id) else {
            return Ok(None);
        };
        if let Some(next) = row.scripted.pop_front() {
            row.status = next;
        }
        Ok(Some(JobStatus::from_code(row.status)))
    }
}

/// In-memory results cache: one record list per job plus metadata documents.
pub struct InMemoryResultsStore {
    containers: RwLock<HashMap<String, Vec<Record>>>,
    metadata: RwLock<HashMap<String, ResultsMetadata>>,
    fail_create_container: AtomicBool,
    fail_write_metadata: AtomicBool,
    unavailable: AtomicBool,
}

impl InMemoryResultsStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            metadata: RwLock::new(HashMap::new()),
            fail_create_container: AtomicBool::new(false),
            fail_write_metadata: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make container creation fail.
    pub fn fail_create_container(&self, fail: bool) {
        self.fail_create_container.store(fail, Ordering::SeqCst);
    }

    /// Make metadata writes fail.
    pub fn fail_write_metadata(&self, fail: bool) {
        self.fail_write_metadata.store(fail, Ordering::SeqCst);
    }

    /// Make every call fail as if the cache were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Append records to a job's container the way the engine would.
    ///
    /// Creates the container if it is missing.
    pub async fn append_results(&self, job_id: JobId, records: impl IntoIterator<Item = Record>) {
        self.containers
            .write()
            .await
            .entry(job_id.to_string())
            .or_default()
            .extend(records);
    }

    pub async fn metadata(&self, job_id: JobId) -> Option<ResultsMetadata> {
        self.metadata.read().await.get(&job_id.to_string()).cloned()
    }

    pub async fn has_container(&self, job_id: JobId) -> bool {
        self.containers
            .read()
            .await
            .contains_key(&job_id.to_string())
    }

    pub async fn container_count(&self) -> usize {
        self.containers.read().await.len()
    }

    pub async fn metadata_count(&self) -> usize {
        self.metadata.read().await.len()
    }

    fn check(&self, injected: bool, what: &str) -> Result<()> {
        if injected || self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable(format!("results cache: {what} failed")));
        }
        Ok(())
    }
}

impl Default for InMemoryResultsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultsStore for InMemoryResultsStore {
    async fn create_container(&self, job_id: JobId) -> Result<()> {
        self.check(
            self.fail_create_container.load(Ordering::SeqCst),
            "create collection",
        )?;

        let mut containers = self.containers.write().await;
        let name = job_id.to_string();
        if containers.contains_key(&name) {
            return Err(Error::StoreUnavailable(format!(
                "results cache: collection {name} already exists"
            )));
        }
        containers.insert(name, Vec::new());
        Ok(())
    }

    async fn write_metadata(&self, metadata: &ResultsMetadata) -> Result<()> {
        self.check(
            self.fail_write_metadata.load(Ordering::SeqCst),
            "insert metadata",
        )?;

        let mut documents = self.metadata.write().await;
        if documents.contains_key(&metadata.id) {
            return Err(Error::StoreUnavailable(format!(
                "results cache: duplicate metadata _id {}",
                metadata.id
            )));
        }
        documents.insert(metadata.id.clone(), metadata.clone());
        Ok(())
    }

    async fn read_results(&self, job_id: JobId) -> Result<Option<Vec<Record>>> {
        self.check(false, "find")?;
        Ok(self
            .containers
            .read()
            .await
            .get(&job_id.to_string())
            .cloned())
    }
}
