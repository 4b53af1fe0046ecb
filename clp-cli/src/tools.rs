//! Tool surface for conversational callers.
//!
//! Each method takes the caller's session id and returns a JSON value: a
//! page or instructions on success, `{"Error": "<message>"}` on failure.
//! Searching and paging are refused until the session has fetched the
//! instructions.
//!
//! [`SearchTools::handle_line`] accepts the same calls as JSON objects
//! tagged by `tool`, one per line.

use std::sync::Arc;

use clp_query::{QueryDriver, clean_records};
use clp_session::{Page, SessionError, SessionManager};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

/// Guidance handed to a caller before it may search.
pub const INSTRUCTIONS: &str = "You help users find log events stored in CLP. Turn each request \
into a KQL (Kibana Query Language) query that is as narrow as the request allows: prefer exact \
field names and values over free text, combine conditions with AND, OR and NOT, and avoid \
leading wildcards since they match large parts of the archive. Pass the time range the user \
asks about as epoch milliseconds. Results arrive in pages; call get_nth_page with a zero-based \
index to read further pages of the last search. If a request is ambiguous, ask the user before \
searching.";

/// Failures surfaced to tool callers.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Please call get_instructions() first to learn how to search the logs.")]
    InstructionsRequired,

    #[error("No log events matched the query.")]
    NoMatches,

    #[error(transparent)]
    Query(#[from] clp_query::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ToolError {
    /// The JSON error object returned to the caller.
    pub fn into_response(self) -> Value {
        json!({ "Error": self.to_string() })
    }
}

fn respond(result: Result<Page, ToolError>) -> Value {
    match result {
        Ok(page) => serde_json::to_value(page).unwrap_or_else(|e| {
            json!({ "Error": format!("failed to render page: {e}") })
        }),
        Err(e) => e.into_response(),
    }
}

/// A tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    GetInstructions {
        session_id: String,
    },
    Search {
        session_id: String,
        query: String,
        begin_ts: i64,
        end_ts: i64,
    },
    GetNthPage {
        session_id: String,
        page_index: usize,
    },
}

/// A tool call with an optional caller-chosen id echoed in the reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(flatten)]
    pub call: ToolCall,
}

/// Search tools bound to one driver and one session cache.
#[derive(Clone)]
pub struct SearchTools {
    driver: QueryDriver,
    sessions: Arc<SessionManager>,
}

impl SearchTools {
    pub fn new(driver: QueryDriver, sessions: Arc<SessionManager>) -> Self {
        Self { driver, sessions }
    }

    /// Return the usage instructions and unlock the other tools for the session.
    pub async fn get_instructions(&self, session_id: &str) -> Value {
        self.sessions.mark_instructions_ran(session_id).await;
        debug!(session_id, "Served instructions");
        Value::String(INSTRUCTIONS.to_string())
    }

    /// Run a search and return the first page of its results.
    pub async fn search(
        &self,
        session_id: &str,
        query: &str,
        begin_ts: i64,
        end_ts: i64,
    ) -> Value {
        respond(self.search_page(session_id, query, begin_ts, end_ts).await)
    }

    /// Page `page_index` of the session's last search.
    pub async fn get_nth_page(&self, session_id: &str, page_index: usize) -> Value {
        respond(self.page(session_id, page_index).await)
    }

    /// Run one tool call.
    pub async fn dispatch(&self, call: ToolCall) -> Value {
        match call {
            ToolCall::GetInstructions { session_id } => self.get_instructions(&session_id).await,
            ToolCall::Search {
                session_id,
                query,
                begin_ts,
                end_ts,
            } => self.search(&session_id, &query, begin_ts, end_ts).await,
            ToolCall::GetNthPage {
                session_id,
                page_index,
            } => self.get_nth_page(&session_id, page_index).await,
        }
    }

    /// Parse one JSON request line, run it and wrap the reply as
    /// `{"id": ..., "result": ...}`.
    pub async fn handle_line(&self, line: &str) -> Value {
        match serde_json::from_str::<ToolRequest>(line) {
            Ok(request) => {
                let result = self.dispatch(request.call).await;
                json!({ "id": request.id, "result": result })
            }
            Err(e) => json!({
                "id": Value::Null,
                "result": { "Error": format!("invalid request: {e}") },
            }),
        }
    }

    /// Typed form of [`search`](Self::search).
    ///
    /// Submits the query, waits for it, caches the cleaned records in the
    /// session and returns page 0.
    pub async fn search_page(
        &self,
        session_id: &str,
        query: &str,
        begin_ts: i64,
        end_ts: i64,
    ) -> Result<Page, ToolError> {
        self.require_instructions(session_id).await?;

        let (job_id, records) = self.driver.search(query, begin_ts, end_ts).await?;
        // The job may have outlived the session; this caller already passed
        // the guard.
        self.sessions.mark_instructions_ran(session_id).await;
        let first = self
            .sessions
            .store_results_and_page(session_id, clean_records(records))
            .await;

        match first {
            Ok(page) => {
                info!(session_id, %job_id, results = page.total_items, "Search finished");
                Ok(page)
            }
            Err(SessionError::PageOutOfRange { total_pages: 0, .. }) => {
                info!(session_id, %job_id, results = 0, "Search finished");
                Err(ToolError::NoMatches)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Typed form of [`get_nth_page`](Self::get_nth_page).
    pub async fn page(&self, session_id: &str, page_index: usize) -> Result<Page, ToolError> {
        self.require_instructions(session_id).await?;
        Ok(self.sessions.get_page(session_id, page_index).await?)
    }

    async fn require_instructions(&self, session_id: &str) -> Result<(), ToolError> {
        if self.sessions.ran_instructions(session_id).await {
            Ok(())
        } else {
            Err(ToolError::InstructionsRequired)
        }
    }
}
