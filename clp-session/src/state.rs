//! Per-session state.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SessionError};
use crate::page::{Page, total_pages};

/// One caller's session: its flags and the last result set it stored.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    ran_instructions: bool,
    results: Option<Vec<Value>>,
}

impl Session {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: now,
            last_accessed: now,
            ran_instructions: false,
            results: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    pub fn ran_instructions(&self) -> bool {
        self.ran_instructions
    }

    pub fn mark_instructions_ran(&mut self) {
        self.ran_instructions = true;
    }

    /// Number of cached records, or `None` if nothing was stored.
    pub fn cached_len(&self) -> Option<usize> {
        self.results.as_ref().map(Vec::len)
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
    }

    /// Idle for strictly longer than `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.last_accessed) > ttl
    }

    /// Replace the cached results.
    pub(crate) fn store(&mut self, records: Vec<Value>) {
        self.results = Some(records);
    }

    /// Page `page_index` of the cached results.
    pub fn page(&self, page_index: usize, page_size: usize) -> Result<Page> {
        let results = self.results.as_deref().ok_or(SessionError::NoResults)?;
        Page::slice(results, page_index, page_size)
    }

    pub(crate) fn info(&self, page_size: usize) -> SessionInfo {
        let total_results = self.cached_len().unwrap_or(0);
        SessionInfo {
            session_id: self.id.clone(),
            created_at: self.created_at.to_rfc3339(),
            last_accessed: self.last_accessed.to_rfc3339(),
            ran_instructions: self.ran_instructions,
            has_cached_results: self.results.is_some(),
            total_results,
            total_pages: total_pages(total_results, page_size),
            page_size,
        }
    }
}

/// Read-only summary of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    /// RFC 3339.
    pub created_at: String,
    /// RFC 3339.
    pub last_accessed: String,
    pub ran_instructions: bool,
    pub has_cached_results: bool,
    pub total_results: usize,
    pub total_pages: usize,
    pub page_size: usize,
}
