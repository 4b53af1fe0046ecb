//! SessionManager for per-caller result pagination
//!
//! Sessions live in a map guarded by one `RwLock` for inserts and removals.
//! Each session sits behind its own `Mutex`, so a page is always cut from a
//! fully stored buffer and work on one session never waits on another.
//! Locks are always taken map first, then session, and the map lock is
//! never held while waiting on a session. A session locked by another caller
//! is in use and is never dropped as expired.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::page::Page;
use crate::state::{Session, SessionInfo};

type SessionHandle = Arc<Mutex<Session>>;

/// Owns every session and the expiry policy shared by all of them.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    config: SessionConfig,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Create a manager on the wall clock.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager with an injected clock.
    ///
    /// A zero page size is raised to one.
    pub fn with_clock(mut config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        if config.page_size == 0 {
            warn!("Session page size of 0 raised to 1");
            config.page_size = 1;
        }
        let ttl = chrono::Duration::from_std(config.ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            ttl,
            clock,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Look up a session, dropping it first if it has expired.
    ///
    /// With `touch`, a live session's last access is set to `now`.
    async fn live_session(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        touch: bool,
    ) -> Option<SessionHandle> {
        let handle = self.sessions.read().await.get(session_id).cloned()?;
        {
            let mut session = handle.lock().await;
            if !session.is_expired(now, self.ttl) {
                if touch {
                    session.touch(now);
                }
                drop(session);
                return Some(handle);
            }
        }

        self.remove_if_expired(session_id, &handle, now).await;
        None
    }

    async fn remove_if_expired(
        &self,
        session_id: &str,
        handle: &SessionHandle,
        now: DateTime<Utc>,
    ) -> bool {
        let mut sessions = self.sessions.write().await;
        let current = sessions
            .get(session_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, handle));
        let expired = current
            && handle
                .try_lock()
                .is_ok_and(|session| session.is_expired(now, self.ttl));
        if expired {
            sessions.remove(session_id);
            info!(session_id, "Session expired");
        }
        expired
    }

    /// Return the live session for `session_id`, creating it if absent or
    /// expired. Refreshes its last access.
    pub async fn get_or_create_session(&self, session_id: &str) -> Arc<Mutex<Session>> {
        let now = self.clock.now();
        loop {
            if let Some(handle) = self.live_session(session_id, now, true).await {
                return handle;
            }

            let mut sessions = self.sessions.write().await;
            // Another caller may have created it since the read above.
            if let Some(existing) = sessions.get(session_id).cloned() {
                let live = match existing.try_lock() {
                    Ok(mut session) => {
                        let live = !session.is_expired(now, self.ttl);
                        if live {
                            session.touch(now);
                        }
                        live
                    }
                    // In use: look again without holding the map lock.
                    Err(_) => continue,
                };
                if live {
                    return existing;
                }
            }

            let handle = Arc::new(Mutex::new(Session::new(session_id, now)));
            sessions.insert(session_id.to_string(), Arc::clone(&handle));
            debug!(session_id, "Created session");
            return handle;
        }
    }

    /// Replace the session's cached results, creating the session if needed.
    ///
    /// Keeps at most `max_cached_results` records and returns how many were
    /// kept.
    pub async fn store_results(&self, session_id: &str, records: Vec<Value>) -> usize {
        let handle = self.get_or_create_session(session_id).await;
        let mut session = handle.lock().await;
        self.replace_results(&mut session, records)
    }

    /// Store results as [`store_results`](Self::store_results) does and cut
    /// page 0 under the same session lock, so the page always comes from
    /// these records.
    pub async fn store_results_and_page(
        &self,
        session_id: &str,
        records: Vec<Value>,
    ) -> Result<Page> {
        let handle = self.get_or_create_session(session_id).await;
        let mut session = handle.lock().await;
        self.replace_results(&mut session, records);
        session.page(0, self.config.page_size)
    }

    fn replace_results(&self, session: &mut Session, mut records: Vec<Value>) -> usize {
        let max = self.config.max_cached_results;
        if records.len() > max {
            warn!(
                session_id = session.id(),
                received = records.len(),
                kept = max,
                "Truncating cached results"
            );
            records.truncate(max);
        }
        let kept = records.len();
        session.store(records);
        debug!(session_id = session.id(), count = kept, "Stored results");
        kept
    }

    /// Page `page_index` (zero-based) of the session's cached results.
    ///
    /// An absent or expired session is reported as [`SessionError::NoResults`]
    /// and is not created.
    pub async fn get_page(&self, session_id: &str, page_index: usize) -> Result<Page> {
        let now = self.clock.now();
        let handle = self
            .live_session(session_id, now, true)
            .await
            .ok_or(SessionError::NoResults)?;
        let session = handle.lock().await;
        session.page(page_index, self.config.page_size)
    }

    /// Record that the caller has read the usage instructions.
    pub async fn mark_instructions_ran(&self, session_id: &str) {
        let handle = self.get_or_create_session(session_id).await;
        handle.lock().await.mark_instructions_ran();
    }

    /// Whether the session has read the usage instructions. Absent sessions
    /// have not.
    pub async fn ran_instructions(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        match self.live_session(session_id, now, true).await {
            Some(handle) => handle.lock().await.ran_instructions(),
            None => false,
        }
    }

    /// Summary of a live session. Does not count as an access.
    pub async fn session_info(&self, session_id: &str) -> Option<SessionInfo> {
        let now = self.clock.now();
        let handle = self.live_session(session_id, now, false).await?;
        let info = handle.lock().await.info(self.config.page_size);
        Some(info)
    }

    /// Number of sessions held, including expired ones not yet swept.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove every expired session and return how many were removed.
    ///
    /// Sessions locked by another caller are skipped until the next sweep.
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let now = self.clock.now();
        let candidates: Vec<(String, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect();

        let mut removed = 0;
        for (id, handle) in candidates {
            let expired = handle
                .try_lock()
                .is_ok_and(|session| session.is_expired(now, self.ttl));
            if expired && self.remove_if_expired(&id, &handle, now).await {
                removed += 1;
            }
        }

        if removed > 0 {
            let remaining = self.sessions.read().await.len();
            info!(
                removed,
                remaining,
                "Removed expired sessions"
            );
        }
        removed
    }

    /// Sweep expired sessions every `interval` until `cancel` fires.
    pub async fn run_sweeper(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.cleanup_expired_sessions().await;
                }
            }
        }
        debug!("Session sweeper stopped");
    }
}
